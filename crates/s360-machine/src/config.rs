//! Configuration: a hand-rolled line-oriented parser for the directive
//! surface below, matching this workspace's preference for a small hand-
//! rolled parser over pulling in a parsing crate for this shape of input.
//!
//! ```text
//! CPU  MODEL=2030|2050|2065 MEM=<KB>
//! DEV  ADDR=<hhh> TYPE=<1442|1443|2415|1050|...> [FILE=<path>] [START]
//! LOG  FILE=<path> [LEVEL={INFO,WARN,ERROR,TRACE,DEVICE,TAPE,DISK,CARD,...}]
//! ```

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub address: u16,
    pub device_type: String,
    pub file: Option<String>,
    pub start: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub file: Option<String>,
    pub levels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemConfig {
    pub model: String,
    pub mem_kb: u32,
    pub devices: Vec<DeviceConfig>,
    pub log: Option<LogConfig>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            model: "2030".to_string(),
            mem_kb: 64,
            devices: Vec::new(),
            log: None,
        }
    }
}

/// Parse a complete configuration file's text. Unknown directive keywords
/// and malformed option pairs are reported as `Err(line_number_message)`
/// rather than silently ignored, matching the `Result<T, String>`
/// host-failure convention (not an architectural program check).
pub fn parse(text: &str) -> Result<SystemConfig, String> {
    let mut config = SystemConfig::default();
    for (lineno, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut words = line.split_whitespace();
        let keyword = words.next().unwrap_or("");
        let options = parse_options(words.collect::<Vec<_>>().as_slice());
        match keyword {
            "CPU" => {
                if let Some(model) = options.get("MODEL") {
                    config.model = model.clone();
                }
                if let Some(mem) = options.get("MEM") {
                    config.mem_kb = mem
                        .parse()
                        .map_err(|_| format!("line {}: bad MEM value {mem:?}", lineno + 1))?;
                }
            }
            "DEV" => {
                let addr = options
                    .get("ADDR")
                    .ok_or_else(|| format!("line {}: DEV missing ADDR", lineno + 1))?;
                let address = u16::from_str_radix(addr, 16)
                    .map_err(|_| format!("line {}: bad ADDR {addr:?}", lineno + 1))?;
                let device_type = options
                    .get("TYPE")
                    .ok_or_else(|| format!("line {}: DEV missing TYPE", lineno + 1))?
                    .clone();
                config.devices.push(DeviceConfig {
                    address,
                    device_type,
                    file: options.get("FILE").cloned(),
                    start: options.contains_key("START"),
                });
            }
            "LOG" => {
                let levels = options
                    .get("LEVEL")
                    .map(|v| v.split(',').map(str::to_string).collect())
                    .unwrap_or_default();
                config.log = Some(LogConfig {
                    file: options.get("FILE").cloned(),
                    levels,
                });
            }
            other => return Err(format!("line {}: unknown directive {other:?}", lineno + 1)),
        }
    }
    Ok(config)
}

fn parse_options(words: &[&str]) -> std::collections::HashMap<String, String> {
    let mut map = std::collections::HashMap::new();
    for word in words {
        match word.split_once('=') {
            Some((k, v)) => {
                map.insert(k.to_string(), v.to_string());
            }
            None => {
                map.insert((*word).to_string(), String::new());
            }
        }
    }
    map
}
