//! Storage layer for taskwell data.
//!
//! Each working directory gets its own data directory at
//! `<data>/taskwell/<repo-hash>/`, where `<data>` is `TW_DATA_DIR` if set and
//! the platform data directory otherwise.
//!
//! Records live in append-only JSONL files:
//! - `projects.jsonl`
//! - `tasks.jsonl`
//! - `subtasks.jsonl`
//! - `memories.jsonl`
//!
//! Updates append a full copy of the record. Readers keep the latest line
//! for each ID and return records in the order they were first created.
//!
//! Session preferences live next to the records in `config.kdl`. System
//! preferences live in `$TW_CONFIG_DIR/config.kdl` or the platform config
//! directory.

pub mod backend;

pub use backend::TaskStore;

use crate::config::TaskwellConfig;
use crate::models::{Memory, Priority, Project, Subtask, Task, TaskStatus};
use crate::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Environment variable overriding the base data directory.
pub const DATA_DIR_ENV: &str = "TW_DATA_DIR";

/// Environment variable overriding the system config directory.
pub const CONFIG_DIR_ENV: &str = "TW_CONFIG_DIR";

const CONFIG_FILE: &str = "config.kdl";

const PROJECTS_FILE: &str = "projects.jsonl";
const TASKS_FILE: &str = "tasks.jsonl";
const SUBTASKS_FILE: &str = "subtasks.jsonl";
const MEMORIES_FILE: &str = "memories.jsonl";

/// ID prefixes per record kind.
pub const TASK_PREFIX: &str = "tw";
pub const PROJECT_PREFIX: &str = "tw-p";
pub const SUBTASK_PREFIX: &str = "tw-s";
pub const MEMORY_PREFIX: &str = "tw-m";

/// A record that can be stored in a JSONL file.
trait Record: Serialize + DeserializeOwned {
    fn id(&self) -> &str;
}

impl Record for Project {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Task {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Subtask {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Memory {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Storage manager for a single working directory.
pub struct Storage {
    /// Root directory for this working directory's data
    pub root: PathBuf,
}

impl Storage {
    /// Open storage for the given working directory, creating it on first use.
    pub fn open(repo_path: &Path) -> Result<Self> {
        let root = get_storage_dir(repo_path)?;
        Self::open_at(root)
    }

    /// Open storage using an explicit base data directory instead of the environment.
    pub fn open_with_data_dir(repo_path: &Path, data_dir: &Path) -> Result<Self> {
        let root = get_storage_dir_with_data_dir(repo_path, data_dir)?;
        Self::open_at(root)
    }

    fn open_at(root: PathBuf) -> Result<Self> {
        if !root.exists() {
            fs::create_dir_all(&root)?;
            tracing::info!(root = %root.display(), "Initialized storage");
        }

        for file in [PROJECTS_FILE, TASKS_FILE, SUBTASKS_FILE, MEMORIES_FILE] {
            let path = root.join(file);
            if !path.exists() {
                File::create(&path)?;
            }
        }

        Ok(Self { root })
    }

    // === Project Operations ===

    /// Create a new project.
    pub fn create_project(&mut self, project: &Project) -> Result<()> {
        self.append_record(PROJECTS_FILE, project)
    }

    /// Get a project by ID.
    pub fn get_project(&self, id: &str) -> Result<Project> {
        self.find_record(PROJECTS_FILE, id)?
            .ok_or_else(|| Error::NotFound(format!("Project not found: {}", id)))
    }

    /// List all projects in creation order.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.read_records(PROJECTS_FILE)
    }

    // === Task Operations ===

    /// Create a new task.
    pub fn create_task(&mut self, task: &Task) -> Result<()> {
        self.append_record(TASKS_FILE, task)
    }

    /// Get a task by ID.
    pub fn get_task(&self, id: &str) -> Result<Task> {
        self.find_record(TASKS_FILE, id)?
            .ok_or_else(|| Error::NotFound(format!("Task not found: {}", id)))
    }

    /// List tasks in creation order, optionally restricted to one project.
    pub fn list_tasks(&self, project_id: Option<&str>) -> Result<Vec<Task>> {
        let tasks: Vec<Task> = self.read_records(TASKS_FILE)?;
        Ok(match project_id {
            Some(pid) => tasks.into_iter().filter(|t| t.project_id == pid).collect(),
            None => tasks,
        })
    }

    /// Update a task.
    pub fn update_task(&mut self, task: &Task) -> Result<()> {
        self.get_task(&task.id)?;
        self.append_record(TASKS_FILE, task)
    }

    // === Subtask Operations ===

    /// Create a new subtask.
    pub fn create_subtask(&mut self, subtask: &Subtask) -> Result<()> {
        self.append_record(SUBTASKS_FILE, subtask)
    }

    /// Get a subtask by ID.
    pub fn get_subtask(&self, id: &str) -> Result<Subtask> {
        self.find_record(SUBTASKS_FILE, id)?
            .ok_or_else(|| Error::NotFound(format!("Subtask not found: {}", id)))
    }

    /// List the subtasks of a task in creation order.
    pub fn list_subtasks(&self, task_id: &str) -> Result<Vec<Subtask>> {
        let subtasks: Vec<Subtask> = self.read_records(SUBTASKS_FILE)?;
        Ok(subtasks
            .into_iter()
            .filter(|s| s.task_id == task_id)
            .collect())
    }

    /// Update a subtask.
    pub fn update_subtask(&mut self, subtask: &Subtask) -> Result<()> {
        self.get_subtask(&subtask.id)?;
        self.append_record(SUBTASKS_FILE, subtask)
    }

    // === Memory Operations ===

    /// Create a new memory.
    pub fn create_memory(&mut self, memory: &Memory) -> Result<()> {
        self.append_record(MEMORIES_FILE, memory)
    }

    /// List memories, optionally filtered by exact tag and/or a text query.
    pub fn list_memories(&self, tag: Option<&str>, query: Option<&str>) -> Result<Vec<Memory>> {
        let memories: Vec<Memory> = self.read_records(MEMORIES_FILE)?;
        Ok(memories
            .into_iter()
            .filter(|m| tag.is_none_or(|t| m.tags.iter().any(|mt| mt == t)))
            .filter(|m| query.is_none_or(|q| m.matches(q)))
            .collect())
    }

    // === Config Operations ===

    /// Path of the session-level config.kdl.
    pub fn config_kdl_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Read the session-level config, or an empty config if none exists.
    pub fn read_config(&self) -> Result<TaskwellConfig> {
        read_config_file(&self.config_kdl_path())
    }

    /// Write the session-level config.
    pub fn write_config(&self, config: &TaskwellConfig) -> Result<()> {
        write_config_file(&self.config_kdl_path(), config)
    }

    /// Path of the system-level config.kdl.
    pub fn system_config_kdl_path() -> Result<PathBuf> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir()
                .ok_or_else(|| Error::Other("Could not determine config directory".to_string()))?
                .join("taskwell"),
        };
        Ok(dir.join(CONFIG_FILE))
    }

    /// Read the system-level config, or an empty config if none exists.
    pub fn read_system_config() -> Result<TaskwellConfig> {
        read_config_file(&Self::system_config_kdl_path()?)
    }

    /// Write the system-level config.
    pub fn write_system_config(config: &TaskwellConfig) -> Result<()> {
        write_config_file(&Self::system_config_kdl_path()?, config)
    }

    // === ID Generation ===

    /// Generate an ID with `prefix` that is not yet used by any record of that kind.
    pub fn new_id(&self, prefix: &str, seed: &str) -> Result<String> {
        let existing = match prefix {
            PROJECT_PREFIX => self.ids_of::<Project>(PROJECTS_FILE)?,
            SUBTASK_PREFIX => self.ids_of::<Subtask>(SUBTASKS_FILE)?,
            MEMORY_PREFIX => self.ids_of::<Memory>(MEMORIES_FILE)?,
            _ => self.ids_of::<Task>(TASKS_FILE)?,
        };

        let mut attempt = 0u32;
        loop {
            let id = generate_id(prefix, &format!("{}:{}", seed, attempt));
            if !existing.contains(&id) {
                return Ok(id);
            }
            attempt += 1;
        }
    }

    // === JSONL helpers ===

    fn append_record<T: Record>(&self, file: &str, record: &T) -> Result<()> {
        let path = self.root.join(file);
        let mut handle = OpenOptions::new().create(true).append(true).open(&path)?;

        let json = serde_json::to_string(record)?;
        writeln!(handle, "{}", json)?;

        tracing::debug!(file, id = record.id(), "Appended record");
        Ok(())
    }

    /// Read every record, keeping the latest version of each ID in first-seen order.
    fn read_records<T: Record>(&self, file: &str) -> Result<Vec<T>> {
        let path = self.root.join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&path)?);

        let mut records: Vec<T> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(&line) {
                Ok(record) => match positions.get(record.id()) {
                    Some(&pos) => records[pos] = record,
                    None => {
                        positions.insert(record.id().to_string(), records.len());
                        records.push(record);
                    }
                },
                Err(e) => {
                    tracing::warn!(file, line = line_no + 1, error = %e, "Skipping malformed record");
                }
            }
        }

        Ok(records)
    }

    fn find_record<T: Record>(&self, file: &str, id: &str) -> Result<Option<T>> {
        let records: Vec<T> = self.read_records(file)?;
        Ok(records.into_iter().find(|r| r.id() == id))
    }

    fn ids_of<T: Record>(&self, file: &str) -> Result<Vec<String>> {
        let records: Vec<T> = self.read_records(file)?;
        Ok(records.iter().map(|r| r.id().to_string()).collect())
    }
}

impl TaskStore for Storage {
    fn find_task(&self, id: &str) -> Result<Option<Task>> {
        self.find_record(TASKS_FILE, id)
    }

    fn get_tasks(&self, project_id: &str) -> Result<Vec<Task>> {
        self.list_tasks(Some(project_id))
    }

    fn get_projects(&self) -> Result<Vec<Project>> {
        self.list_projects()
    }

    fn create_subtask(&mut self, subtask: &Subtask) -> Result<()> {
        Storage::create_subtask(self, subtask)
    }

    fn new_subtask_id(&self, seed: &str) -> Result<String> {
        self.new_id(SUBTASK_PREFIX, seed)
    }
}

/// Get the storage directory for a working directory.
///
/// Uses `TW_DATA_DIR` as the base if set, otherwise the platform data
/// directory (e.g. `~/.local/share`).
pub fn get_storage_dir(repo_path: &Path) -> Result<PathBuf> {
    let data_dir = match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::data_dir()
            .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?,
    };
    get_storage_dir_with_data_dir(repo_path, &data_dir)
}

/// Get the storage directory for a working directory under an explicit base.
///
/// The last path component is a hash of the canonical working directory, so
/// the same directory always maps to the same storage.
pub fn get_storage_dir_with_data_dir(repo_path: &Path, data_dir: &Path) -> Result<PathBuf> {
    let repo_canonical = repo_path.canonicalize().map_err(|e| {
        Error::InvalidInput(format!(
            "Working directory {} is not accessible: {}",
            repo_path.display(),
            e
        ))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(repo_canonical.to_string_lossy().as_bytes());
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    let short_hash = &hash_hex[..12];

    Ok(data_dir.join("taskwell").join(short_hash))
}

fn read_config_file(path: &Path) -> Result<TaskwellConfig> {
    if !path.exists() {
        return Ok(TaskwellConfig::default());
    }
    let content = fs::read_to_string(path)?;
    let doc: kdl::KdlDocument = content.parse()?;
    let config = TaskwellConfig::from_kdl(&doc);
    config
        .validate()
        .map_err(|e| Error::InvalidInput(format!("{}: {}", path.display(), e)))?;
    Ok(config)
}

fn write_config_file(path: &Path, config: &TaskwellConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, config.to_kdl().to_string())?;
    tracing::debug!(path = %path.display(), "Wrote config");
    Ok(())
}

/// Generate an ID for a record.
///
/// Format: `<prefix>-<4 hex chars>`
/// - Task prefix: "tw"
/// - Project prefix: "tw-p"
/// - Subtask prefix: "tw-s"
/// - Memory prefix: "tw-m"
pub fn generate_id(prefix: &str, seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(0)
            .to_le_bytes(),
    );
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    format!("{}-{}", prefix, &hash_hex[..4])
}

/// Parse a status string into TaskStatus.
pub fn parse_status(s: &str) -> Result<TaskStatus> {
    match s.to_lowercase().as_str() {
        "pending" => Ok(TaskStatus::Pending),
        "in_progress" | "in-progress" | "inprogress" => Ok(TaskStatus::InProgress),
        "blocked" => Ok(TaskStatus::Blocked),
        "done" | "completed" => Ok(TaskStatus::Done),
        _ => Err(Error::InvalidInput(format!("Invalid status: {}", s))),
    }
}

/// Parse a priority string into Priority.
pub fn parse_priority(s: &str) -> Result<Priority> {
    match s.to_lowercase().as_str() {
        "low" => Ok(Priority::Low),
        "medium" | "normal" => Ok(Priority::Medium),
        "high" => Ok(Priority::High),
        _ => Err(Error::InvalidInput(format!("Invalid priority: {}", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    fn create_test_storage() -> (TestEnv, Storage) {
        let env = TestEnv::new();
        let storage = env.open_storage();
        (env, storage)
    }

    fn sample_task(id: &str, project_id: &str, name: &str) -> Task {
        Task::new(id.to_string(), project_id.to_string(), name.to_string())
    }

    #[test]
    fn test_generate_id_format() {
        let id = generate_id("tw", "test seed");
        assert!(id.starts_with("tw-"));
        assert_eq!(id.len(), 7); // "tw-" + 4 hex chars
    }

    #[test]
    fn test_generate_id_prefixes() {
        assert!(generate_id(PROJECT_PREFIX, "seed").starts_with("tw-p-"));
        assert!(generate_id(SUBTASK_PREFIX, "seed").starts_with("tw-s-"));
        assert!(generate_id(MEMORY_PREFIX, "seed").starts_with("tw-m-"));
    }

    #[test]
    fn test_storage_open_creates_files() {
        let (_env, storage) = create_test_storage();

        assert!(storage.root.exists());
        assert!(storage.root.join("projects.jsonl").exists());
        assert!(storage.root.join("tasks.jsonl").exists());
        assert!(storage.root.join("subtasks.jsonl").exists());
        assert!(storage.root.join("memories.jsonl").exists());
    }

    #[test]
    fn test_same_directory_maps_to_same_storage() {
        let env = TestEnv::new();
        let a = env.open_storage();
        let b = env.open_storage();
        assert_eq!(a.root, b.root);

        let other = TestEnv::new();
        let c = Storage::open_with_data_dir(other.path(), env.data_path()).unwrap();
        assert_ne!(a.root, c.root);
    }

    #[test]
    fn test_missing_working_directory_is_rejected() {
        let env = TestEnv::new();
        let missing = env.path().join("does-not-exist");
        let result = Storage::open_with_data_dir(&missing, env.data_path());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_create_and_get_task() {
        let (_env, mut storage) = create_test_storage();

        let task = sample_task("tw-0001", "tw-p-0001", "Test task");
        storage.create_task(&task).unwrap();

        let retrieved = storage.get_task("tw-0001").unwrap();
        assert_eq!(retrieved.id, "tw-0001");
        assert_eq!(retrieved.name, "Test task");
    }

    #[test]
    fn test_get_missing_task_is_not_found() {
        let (_env, storage) = create_test_storage();
        match storage.get_task("tw-ffff") {
            Err(Error::NotFound(msg)) => assert!(msg.contains("tw-ffff")),
            other => panic!("Expected NotFound, got {:?}", other.map(|t| t.id)),
        }
        assert!(storage.find_task("tw-ffff").unwrap().is_none());
    }

    #[test]
    fn test_update_task_keeps_creation_order() {
        let (_env, mut storage) = create_test_storage();

        let mut first = sample_task("tw-0001", "tw-p-0001", "First");
        storage.create_task(&first).unwrap();
        storage
            .create_task(&sample_task("tw-0002", "tw-p-0001", "Second"))
            .unwrap();

        first.name = "First (renamed)".to_string();
        first.set_status(TaskStatus::InProgress);
        storage.update_task(&first).unwrap();

        let tasks = storage.list_tasks(None).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, "tw-0001");
        assert_eq!(tasks[0].name, "First (renamed)");
        assert_eq!(tasks[0].status, TaskStatus::InProgress);
        assert_eq!(tasks[1].id, "tw-0002");
    }

    #[test]
    fn test_update_missing_task_fails() {
        let (_env, mut storage) = create_test_storage();
        let task = sample_task("tw-0001", "tw-p-0001", "Ghost");
        assert!(matches!(
            storage.update_task(&task),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_list_tasks_by_project() {
        let (_env, mut storage) = create_test_storage();

        storage
            .create_task(&sample_task("tw-0001", "tw-p-aaaa", "A1"))
            .unwrap();
        storage
            .create_task(&sample_task("tw-0002", "tw-p-bbbb", "B1"))
            .unwrap();
        storage
            .create_task(&sample_task("tw-0003", "tw-p-aaaa", "A2"))
            .unwrap();

        let a: Vec<String> = storage
            .get_tasks("tw-p-aaaa")
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(a, vec!["tw-0001", "tw-0003"]);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let (_env, mut storage) = create_test_storage();
        storage
            .create_task(&sample_task("tw-0001", "tw-p-0001", "Good"))
            .unwrap();

        let mut file = OpenOptions::new()
            .append(true)
            .open(storage.root.join("tasks.jsonl"))
            .unwrap();
        writeln!(file, "{{not json").unwrap();
        writeln!(file).unwrap();

        let tasks = storage.list_tasks(None).unwrap();
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn test_projects_roundtrip() {
        let (_env, mut storage) = create_test_storage();
        let mut project = Project::new("tw-p-0001".to_string(), "Website".to_string());
        project.description = "Marketing site".to_string();
        storage.create_project(&project).unwrap();

        let projects = storage.get_projects().unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].description, "Marketing site");
        assert!(storage.get_project("tw-p-0001").is_ok());
        assert!(storage.get_project("tw-p-ffff").is_err());
    }

    #[test]
    fn test_subtasks_filtered_by_task() {
        let (_env, mut storage) = create_test_storage();
        let parent = sample_task("tw-0001", "tw-p-0001", "Parent");
        let other = sample_task("tw-0002", "tw-p-0001", "Other");

        storage
            .create_subtask(&Subtask::new("tw-s-0001".to_string(), &parent, "One".to_string()))
            .unwrap();
        storage
            .create_subtask(&Subtask::new("tw-s-0002".to_string(), &other, "Two".to_string()))
            .unwrap();

        let subtasks = storage.list_subtasks("tw-0001").unwrap();
        assert_eq!(subtasks.len(), 1);
        assert_eq!(subtasks[0].project_id, "tw-p-0001");

        let mut one = subtasks[0].clone();
        one.completed = true;
        storage.update_subtask(&one).unwrap();
        assert!(storage.get_subtask("tw-s-0001").unwrap().completed);
    }

    #[test]
    fn test_list_memories_filters() {
        let (_env, mut storage) = create_test_storage();

        let mut deploy = Memory::new(
            "tw-m-0001".to_string(),
            "Deploy".to_string(),
            "Use the blue cluster".to_string(),
        );
        deploy.tags = vec!["ops".to_string()];
        storage.create_memory(&deploy).unwrap();
        storage
            .create_memory(&Memory::new(
                "tw-m-0002".to_string(),
                "Style".to_string(),
                "Prefer small functions".to_string(),
            ))
            .unwrap();

        assert_eq!(storage.list_memories(None, None).unwrap().len(), 2);
        assert_eq!(storage.list_memories(Some("ops"), None).unwrap().len(), 1);
        assert_eq!(storage.list_memories(None, Some("SMALL")).unwrap().len(), 1);
        assert!(
            storage
                .list_memories(Some("ops"), Some("small"))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_new_id_avoids_existing_ids() {
        let (_env, mut storage) = create_test_storage();
        let id = storage.new_id(TASK_PREFIX, "seed").unwrap();
        storage
            .create_task(&sample_task(&id, "tw-p-0001", "Taken"))
            .unwrap();

        for i in 0..20 {
            let next = storage.new_id(TASK_PREFIX, &format!("seed{}", i)).unwrap();
            assert_ne!(next, id);
        }
    }

    #[test]
    fn test_session_config_roundtrip() {
        let (_env, storage) = create_test_storage();
        assert_eq!(storage.read_config().unwrap(), TaskwellConfig::default());

        let config = TaskwellConfig {
            complexity_threshold: Some(5),
            suggest_breakdown: Some(false),
            log_level: None,
        };
        storage.write_config(&config).unwrap();

        assert!(storage.config_kdl_path().exists());
        assert_eq!(storage.read_config().unwrap(), config);
    }

    #[test]
    fn test_invalid_config_kdl_is_an_error() {
        let (_env, storage) = create_test_storage();
        fs::write(storage.config_kdl_path(), "complexity-threshold {").unwrap();
        assert!(matches!(storage.read_config(), Err(Error::Kdl(_))));
    }

    #[test]
    fn test_out_of_range_config_threshold_is_an_error() {
        let (_env, storage) = create_test_storage();
        fs::write(storage.config_kdl_path(), "complexity-threshold 0").unwrap();

        let err = storage.read_config().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.to_string().contains("complexity-threshold must be 1-10, got 0"));
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("pending").unwrap(), TaskStatus::Pending);
        assert_eq!(parse_status("in_progress").unwrap(), TaskStatus::InProgress);
        assert_eq!(parse_status("in-progress").unwrap(), TaskStatus::InProgress);
        assert_eq!(parse_status("DONE").unwrap(), TaskStatus::Done);
        assert!(parse_status("invalid").is_err());
    }

    #[test]
    fn test_parse_priority() {
        assert_eq!(parse_priority("High").unwrap(), Priority::High);
        assert_eq!(parse_priority("low").unwrap(), Priority::Low);
        assert!(parse_priority("urgent").is_err());
    }
}
