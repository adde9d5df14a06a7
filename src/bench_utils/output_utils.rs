use crate::account::Address;
use crate::error::Result;
use primitive_types::U256;

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

const WEI_DECIMALS: usize = 18;

/// Reads a flat JSON array of private key strings.
pub fn read_key_list(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let keys: Vec<String> = serde_json::from_reader(BufReader::new(file))?;
    Ok(keys)
}

/// Writes keys as a pretty-printed JSON array, replacing the file.
pub fn write_key_list(path: &Path, keys: &[String]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(serde_json::to_string_pretty(keys)?.as_bytes())?;
    Ok(())
}

/// Renders a base-unit amount with 18 decimals, trimming trailing zeros.
pub fn format_ether(value: U256) -> String {
    let digits = value.to_string();
    let (whole, fraction) = if digits.len() > WEI_DECIMALS {
        let split = digits.len() - WEI_DECIMALS;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        (
            "0".to_string(),
            format!("{digits:0>width$}", width = WEI_DECIMALS),
        )
    };
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{whole}.0")
    } else {
        format!("{whole}.{fraction}")
    }
}

pub fn balance_line(address: &Address, balance: U256) -> String {
    format!(
        "\t - got a balance of {} for address {}",
        format_ether(balance),
        address
    )
}

#[cfg(test)]
mod tests {
    use crate::bench_utils::output_utils::{format_ether, read_key_list, write_key_list};
    use primitive_types::U256;

    #[test]
    fn key_list_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        let keys = vec!["0x01".to_string(), "0x02".to_string()];
        write_key_list(&path, &keys).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "[\n  \"0x01\",\n  \"0x02\"\n]");
        assert_eq!(read_key_list(&path).unwrap(), keys);
    }

    #[test]
    fn missing_or_malformed_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_key_list(&dir.path().join("nope.json")).is_err());

        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\"key\": 1}").unwrap();
        assert!(read_key_list(&path).is_err());
    }

    #[test]
    fn formats_ether_amounts() {
        assert_eq!(format_ether(U256::zero()), "0.0");
        assert_eq!(format_ether(U256::exp10(18)), "1.0");
        assert_eq!(format_ether(U256::from(1_500_000_000_000_000_000u64)), "1.5");
        assert_eq!(format_ether(U256::from(1u64)), "0.000000000000000001");
        assert_eq!(format_ether(U256::exp10(21)), "1000.0");
    }
}
