//! CLI argument definitions using clap derive macros.

use clap::{Args as ClapArgs, Parser, Subcommand};

/// Resolve short bibliographic references and fetch their PDFs.
///
/// A reference is a DOI, an ADS bibcode, an arXiv identifier, a nickname,
/// or `surname.year` (`surname.*` for any year).
#[derive(Parser, Debug)]
#[command(name = "bib")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Show a publication, learning it from ADS/Crossref/arXiv if unknown
    Info(RefArgs),
    /// List every stored publication matching a reference
    List(RefArgs),
    /// Download the PDF for a publication into the library
    Pdf(RefArgs),
    /// Record that a publication was read and print its PDF path
    Read(RefArgs),
    /// Delete a publication and everything attached to it
    Delete(RefArgs),
    /// Search ADS by year and first-author surname (e.g. `bib search 2013 smith`)
    Search(SearchArgs),
}

#[derive(ClapArgs, Debug, PartialEq, Eq)]
pub struct RefArgs {
    /// DOI, bibcode, arXiv id, nickname or surname.year
    pub reference: String,
}

#[derive(ClapArgs, Debug, PartialEq, Eq)]
pub struct SearchArgs {
    /// Years and at most one surname
    #[arg(required = true, num_args = 1..)]
    pub terms: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_info_subcommand_takes_reference() {
        let cli = Cli::try_parse_from(["bib", "info", "10.1086/305772"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Info(RefArgs {
                reference: "10.1086/305772".to_string()
            })
        );
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["bib", "pdf", "smith.2020", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);

        let cli = Cli::try_parse_from(["bib", "--quiet", "read", "attn"]).unwrap();
        assert!(cli.quiet);
    }

    #[test]
    fn test_cli_search_collects_terms() {
        let cli = Cli::try_parse_from(["bib", "search", "2013", "smith"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Search(SearchArgs {
                terms: vec!["2013".to_string(), "smith".to_string()]
            })
        );
    }

    #[test]
    fn test_cli_search_requires_terms() {
        let err = Cli::try_parse_from(["bib", "search"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["bib"]).is_err());
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Cli::try_parse_from(["bib", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
