//! Argument parsing shared by `blobpack` and `blobunpack`: both tools take
//! an identical `[--page-size N] src-path dst-path` surface.

use std::path::PathBuf;

use crate::error::ArgError;

/// Page sizes the target file format's header can represent.
pub const VALID_PAGE_SIZES: [u32; 8] = [512, 1024, 2048, 4096, 8192, 16384, 32768, 65536];

#[derive(Debug)]
pub struct Args {
    pub page_size: Option<u32>,
    pub src_path: PathBuf,
    pub dst_path: PathBuf,
}

/// Parses `argv` (including `argv[0]`, used only for the usage message).
///
/// `--` terminates option parsing. Unknown options, a missing
/// `--page-size` value, an unparseable one, or one outside
/// [`VALID_PAGE_SIZES`] are all argument errors. The reference C parser's
/// `!scanf(...) || a!=X && a!=Y...` condition mixes `&&`/`||` precedence
/// in a way that happens to work but is fragile (noted as an open
/// question upstream); this checks against an explicit allow-list instead.
pub fn parse_args(argv: &[String]) -> Result<Args, ArgError> {
    let progname = progname(argv.first().map(String::as_str).unwrap_or("blobpack"));

    let mut page_size = None;
    let mut i = 1;
    while i < argv.len() {
        let arg = argv[i].as_str();
        if !arg.starts_with('-') {
            break;
        }
        i += 1;
        if arg == "--" {
            break;
        }
        if arg == "--page-size" {
            let value = argv
                .get(i)
                .ok_or_else(|| ArgError(format!("Missing value for option {arg}")))?;
            i += 1;
            let parsed: u32 = value
                .parse()
                .map_err(|_| ArgError(format!("Invalid page size {value}")))?;
            if !VALID_PAGE_SIZES.contains(&parsed) {
                return Err(ArgError(format!("Invalid page size {value}")));
            }
            page_size = Some(parsed);
        } else {
            return Err(ArgError(format!(
                "Unknown option {arg}\n{}",
                usage(progname)
            )));
        }
    }

    if argv.len() - i < 2 {
        return Err(ArgError(usage(progname)));
    }

    Ok(Args {
        page_size,
        src_path: PathBuf::from(&argv[i]),
        dst_path: PathBuf::from(&argv[i + 1]),
    })
}

fn progname(arg0: &str) -> &str {
    arg0.rsplit('/').next().unwrap_or(arg0)
}

fn usage(progname: &str) -> String {
    format!(
        "Usage: {progname} [ options ] src-path dst-path\n    Options:\n        --page-size         number\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_paths_with_no_options() {
        let args = parse_args(&argv(&["blobpack", "src.db", "dst.db"])).unwrap();
        assert_eq!(args.page_size, None);
        assert_eq!(args.src_path.to_str().unwrap(), "src.db");
        assert_eq!(args.dst_path.to_str().unwrap(), "dst.db");
    }

    #[test]
    fn parses_page_size() {
        let args = parse_args(&argv(&["blobpack", "--page-size", "4096", "src.db", "dst.db"]))
            .unwrap();
        assert_eq!(args.page_size, Some(4096));
    }

    #[test]
    fn rejects_invalid_page_size() {
        assert!(parse_args(&argv(&["blobpack", "--page-size", "4097", "src.db", "dst.db"]))
            .is_err());
        assert!(parse_args(&argv(&["blobpack", "--page-size", "not-a-number", "src.db", "dst.db"]))
            .is_err());
    }

    #[test]
    fn double_dash_terminates_options() {
        let args = parse_args(&argv(&["blobpack", "--", "--page-size", "dst.db"])).unwrap();
        assert_eq!(args.src_path.to_str().unwrap(), "--page-size");
        assert_eq!(args.dst_path.to_str().unwrap(), "dst.db");
    }

    #[test]
    fn missing_paths_is_an_error() {
        assert!(parse_args(&argv(&["blobpack"])).is_err());
        assert!(parse_args(&argv(&["blobpack", "src.db"])).is_err());
    }

    #[test]
    fn unknown_option_is_an_error() {
        assert!(parse_args(&argv(&["blobpack", "--bogus", "src.db", "dst.db"])).is_err());
    }
}
