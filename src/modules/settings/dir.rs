use crate::modules::context::Initialize;
use crate::modules::settings::cli::SETTINGS;
use crate::{
    modules::error::{code::ErrorCode, MailSweepResult},
    raise_error,
};
use std::path::PathBuf;
use std::sync::LazyLock;

const LOG_DIR: &str = "logs";
const AUDIT_DIR: &str = "audit";
const SCRIPT_LOG_DIR: &str = "script-logs";
pub const AUDIT_FILE: &str = "purge-audit.ndjson";

pub static DATA_DIR_MANAGER: LazyLock<DataDirManager> =
    LazyLock::new(|| DataDirManager::new(PathBuf::from(&SETTINGS.mailsweep_root_dir)));

#[derive(Debug)]
pub struct DataDirManager {
    pub root_dir: PathBuf,
    pub log_dir: PathBuf,
    pub audit_dir: PathBuf,
    pub script_log_dir: PathBuf,
    pub audit_file: PathBuf,
}

impl Initialize for DataDirManager {
    async fn initialize() -> MailSweepResult<()> {
        std::fs::create_dir_all(&DATA_DIR_MANAGER.root_dir)
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
        std::fs::create_dir_all(&DATA_DIR_MANAGER.log_dir)
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
        std::fs::create_dir_all(&DATA_DIR_MANAGER.audit_dir)
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
        std::fs::create_dir_all(&DATA_DIR_MANAGER.script_log_dir)
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
        Ok(())
    }
}

impl DataDirManager {
    pub fn new(root_dir: PathBuf) -> Self {
        let audit_dir = root_dir.join(AUDIT_DIR);
        Self {
            root_dir: root_dir.clone(),
            log_dir: root_dir.join(LOG_DIR),
            audit_file: audit_dir.join(AUDIT_FILE),
            audit_dir,
            script_log_dir: root_dir.join(SCRIPT_LOG_DIR),
        }
    }
}
