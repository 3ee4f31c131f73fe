#![allow(dead_code)]

use anyhow::Result;
use dashalert_server::config::ServerConfig;
use tempfile::TempDir;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub config: ServerConfig,
}

pub fn build_test_context() -> Result<TestContext> {
    dashalert_common::id::init(1, 1);
    let temp_dir = tempfile::tempdir()?;
    let toml = format!(
        "[database]\ndata_dir = \"{}\"\n",
        temp_dir.path().join("data").display()
    );
    let config = ServerConfig::from_toml(&toml)?;
    Ok(TestContext { temp_dir, config })
}
