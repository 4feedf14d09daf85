use crate::recognition::ScriptCode;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Script selector used when a request does not name one.
    pub default_script: ScriptCode,
    /// Engine configuration string forwarded verbatim to the recognition engine.
    pub engine_config: String,
    pub max_file_size: usize,
    pub tessdata_path: Option<String>,
}
