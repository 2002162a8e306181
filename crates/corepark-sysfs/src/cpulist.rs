//! Parser for the kernel's cpu-list format (`0-3,6,8-9`).

use corepark_core::{CoreId, PlatformError, PlatformResult};

/// Expand a cpu list into ascending core ids. An empty list is valid and
/// yields no cores.
pub fn parse_cpu_list(text: &str) -> PlatformResult<Vec<CoreId>> {
    let mut cores = Vec::new();

    for part in text.trim().split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start, end)) = part.split_once('-') {
            let start = parse_id(start)?;
            let end = parse_id(end)?;
            if end < start {
                return Err(PlatformError::Parse(format!("descending cpu range '{part}'")));
            }
            cores.extend(start..=end);
        } else {
            cores.push(parse_id(part)?);
        }
    }

    cores.sort_unstable();
    cores.dedup();
    Ok(cores)
}

fn parse_id(s: &str) -> PlatformResult<CoreId> {
    s.trim()
        .parse::<CoreId>()
        .map_err(|_| PlatformError::Parse(format!("invalid cpu id '{s}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ranges_and_singles() {
        assert_eq!(parse_cpu_list("0-3").unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(parse_cpu_list("0-1,4,6-7\n").unwrap(), vec![0, 1, 4, 6, 7]);
        assert_eq!(parse_cpu_list("5").unwrap(), vec![5]);
    }

    #[test]
    fn empty_list_is_no_cores() {
        assert!(parse_cpu_list("").unwrap().is_empty());
        assert!(parse_cpu_list("\n").unwrap().is_empty());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_cpu_list("a-b").is_err());
        assert!(parse_cpu_list("4-2").is_err());
        assert!(parse_cpu_list("1,,x").is_err());
    }
}
