//! Programmer registration and dispatch
//!
//! This module provides a centralized registry for all programmers, with support
//! for feature-gated inclusion and dynamic help text generation.

use capflash_core::driver::{ProtocolTable, SpiFlash, SpiMaster};

use crate::error::CliError;

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Protocol table holding whichever drivers the programmer provides
pub type BoxedProtocols = ProtocolTable<Box<dyn SpiFlash>, Box<dyn SpiMaster>>;

/// An opened programmer
pub struct ProgrammerHandle {
    /// Installed drivers
    pub protocols: BoxedProtocols,
    /// Access to emulated flash contents, for programmers that have them
    #[cfg(feature = "dummy")]
    pub monitor: Option<capflash_dummy::DummyMonitor>,
}

impl ProgrammerHandle {
    /// Emulated flash contents, if the programmer has any
    pub fn contents(&self) -> Option<Vec<u8>> {
        #[cfg(feature = "dummy")]
        if let Some(monitor) = &self.monitor {
            return Some(monitor.contents());
        }
        None
    }
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &["emulator"],
        description: "In-memory flash emulator (size=,sector=,page=,fail=<faults>)",
    });

    programmers
}

/// Generate help text listing all available programmers
pub fn programmer_help() -> String {
    let programmers = available_programmers();

    if programmers.is_empty() {
        return "No programmers available (recompile with programmer features enabled)"
            .to_string();
    }

    let mut help = String::from("Available programmers:\n");
    for p in &programmers {
        help.push_str(&format!("  {:12} - {}\n", p.name, p.description));
    }

    help
}

/// Resolve a name or alias to the primary programmer name
pub fn find_programmer(name: &str) -> Option<&'static str> {
    available_programmers()
        .into_iter()
        .find(|p| p.name == name || p.aliases.contains(&name))
        .map(|p| p.name)
}

/// Split `name[:key=value,...]` into the name and its options
pub fn parse_programmer_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

/// Parse a byte count, with optional K/M suffix or 0x prefix
#[cfg(feature = "dummy")]
pub fn parse_size(s: &str) -> Option<usize> {
    let s = s.trim();
    let (digits, multiplier) = match s.as_bytes().last()? {
        b'K' | b'k' => (&s[..s.len() - 1], 1024),
        b'M' | b'm' => (&s[..s.len() - 1], 1024 * 1024),
        _ => (s, 1),
    };

    let value = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        usize::from_str_radix(hex, 16).ok()?
    } else {
        digits.parse::<usize>().ok()?
    };

    value.checked_mul(multiplier)
}

/// Open the programmer described by `programmer`
pub fn open_programmer(programmer: &str) -> Result<ProgrammerHandle, CliError> {
    let (name, options) = parse_programmer_string(programmer);

    let canonical_name = find_programmer(name).ok_or_else(|| CliError::UnknownProgrammer {
        name: name.to_string(),
        help: programmer_help(),
    })?;

    match canonical_name {
        #[cfg(feature = "dummy")]
        "dummy" => {
            let config = dummy_config(&options)?;
            log::info!(
                "Opening dummy programmer ({} bytes, {} byte sectors)",
                config.size,
                config.sector_size
            );
            let (flash, master, monitor) = capflash_dummy::new_dummy(config);
            let flash: Box<dyn SpiFlash> = Box::new(flash);
            let master: Box<dyn SpiMaster> = Box::new(master);
            Ok(ProgrammerHandle {
                protocols: ProtocolTable::with(flash, master),
                monitor: Some(monitor),
            })
        }
        _ => {
            let _ = options;
            Err(CliError::UnknownProgrammer {
                name: name.to_string(),
                help: programmer_help(),
            })
        }
    }
}

/// Build the dummy configuration from programmer options
#[cfg(feature = "dummy")]
pub fn dummy_config(options: &[(&str, &str)]) -> Result<capflash_dummy::DummyConfig, CliError> {
    use capflash_dummy::{DummyConfig, Faults};

    let invalid = |key: &str, value: &str| CliError::InvalidParameter {
        key: key.to_string(),
        value: value.to_string(),
    };
    let nonzero_size = |key: &str, value: &str| {
        parse_size(value)
            .filter(|&n| n > 0)
            .ok_or_else(|| invalid(key, value))
    };

    let mut config = DummyConfig::default();
    for &(key, value) in options {
        match key {
            "size" => config.size = nonzero_size(key, value)?,
            "sector" => config.sector_size = nonzero_size(key, value)?,
            "page" => config.page_size = nonzero_size(key, value)?,
            "fail" => {
                config.faults = Faults::from_names(value).ok_or_else(|| invalid(key, value))?
            }
            _ => return Err(CliError::UnknownParameter(key.to_string())),
        }
    }

    if config.size % config.sector_size != 0 {
        return Err(invalid("sector", &config.sector_size.to_string()));
    }
    if config.sector_size % config.page_size != 0 {
        return Err(invalid("page", &config.page_size.to_string()));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_programmer_string() {
        assert_eq!(parse_programmer_string("dummy"), ("dummy", vec![]));
        assert_eq!(
            parse_programmer_string("dummy:size=1M,fail=init"),
            ("dummy", vec![("size", "1M"), ("fail", "init")])
        );
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("4096"), Some(4096));
        assert_eq!(parse_size("4K"), Some(4096));
        assert_eq!(parse_size("16M"), Some(16 * 1024 * 1024));
        assert_eq!(parse_size("0x1000"), Some(4096));
        assert_eq!(parse_size(""), None);
        assert_eq!(parse_size("12Q"), None);
    }

    #[test]
    fn test_unknown_programmer() {
        assert!(matches!(
            open_programmer("ch341a"),
            Err(CliError::UnknownProgrammer { .. })
        ));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_dummy_config_options() {
        use capflash_dummy::Faults;

        let config = dummy_config(&[
            ("size", "1M"),
            ("sector", "64K"),
            ("fail", "read_id+update"),
        ])
        .unwrap();
        assert_eq!(config.size, 1024 * 1024);
        assert_eq!(config.sector_size, 64 * 1024);
        assert_eq!(config.faults, Faults::READ_ID | Faults::UPDATE);
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_dummy_config_rejects_bad_values() {
        assert!(matches!(
            dummy_config(&[("size", "0")]),
            Err(CliError::InvalidParameter { .. })
        ));
        assert!(matches!(
            dummy_config(&[("fail", "everything")]),
            Err(CliError::InvalidParameter { .. })
        ));
        assert!(matches!(
            dummy_config(&[("size", "6K")]),
            Err(CliError::InvalidParameter { .. })
        ));
        assert!(matches!(
            dummy_config(&[("speed", "1")]),
            Err(CliError::UnknownParameter(_))
        ));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy_by_alias() {
        let handle = open_programmer("emulator:size=64K").unwrap();
        assert!(handle.protocols.flash().is_some());
        assert!(handle.protocols.master().is_some());
        assert_eq!(handle.contents().map(|c| c.len()), Some(64 * 1024));
    }
}
