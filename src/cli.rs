//! CLI argument parsing for the crm-import-worker binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::MappingError;
use crate::types::{ColumnMapping, SingleField};

#[derive(Parser)]
#[command(name = "crm-import-worker", about = "CRM bulk import worker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the worker server (default if no subcommand given)
    Serve,
    /// Run database migrations and exit
    Migrate,
    /// Show headers, row count and the suggested column mapping of a file
    Preview {
        file: PathBuf,
    },
    /// Import a CSV or spreadsheet file
    Import(ImportArgs),
    /// Write a file back out as clean CSV
    Normalize {
        file: PathBuf,
        out: PathBuf,
    },
}

/// Column overrides use 0-based indices as printed by `preview`
#[derive(Args, Debug, Default)]
pub struct ImportArgs {
    pub file: PathBuf,

    /// Rows to import, e.g. "1-100, 205, 310-" (1-based); all rows when omitted
    #[arg(long, default_value = "")]
    pub rows: String,

    #[arg(long)]
    pub org_name: Option<usize>,
    #[arg(long)]
    pub website: Option<usize>,
    #[arg(long)]
    pub sector: Option<usize>,
    #[arg(long)]
    pub city: Option<usize>,
    #[arg(long)]
    pub country: Option<usize>,
    #[arg(long)]
    pub person_name: Option<usize>,
    #[arg(long)]
    pub designation: Option<usize>,

    /// Email columns, comma separated
    #[arg(long, value_delimiter = ',')]
    pub emails: Option<Vec<usize>>,

    /// Phone columns, comma separated
    #[arg(long, value_delimiter = ',')]
    pub phones: Option<Vec<usize>>,

    /// Run against an empty in-memory store instead of the database
    #[arg(long)]
    pub dry_run: bool,
}

impl ImportArgs {
    fn single_overrides(&self) -> [(SingleField, Option<usize>); 7] {
        [
            (SingleField::OrgName, self.org_name),
            (SingleField::Website, self.website),
            (SingleField::Sector, self.sector),
            (SingleField::City, self.city),
            (SingleField::Country, self.country),
            (SingleField::PersonName, self.person_name),
            (SingleField::Designation, self.designation),
        ]
    }

    /// Apply the overrides on top of a suggested mapping.
    ///
    /// Overridden single fields are cleared first so columns can be swapped
    /// between fields in one invocation.
    pub fn apply(&self, mapping: &mut ColumnMapping) -> Result<(), MappingError> {
        let overrides = self.single_overrides();
        for (field, index) in overrides {
            if index.is_some() {
                mapping.set_single(field, None)?;
            }
        }
        for (field, index) in overrides {
            if index.is_some() {
                mapping.set_single(field, index)?;
            }
        }
        if let Some(emails) = &self.emails {
            mapping.set_emails(emails.iter().copied());
        }
        if let Some(phones) = &self.phones {
            mapping.set_phones(phones.iter().copied());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::classifier::classify;
    use clap::Parser;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|h| h.to_string()).collect()
    }

    #[test]
    fn test_cli_migrate_command_parses() {
        let cli = Cli::parse_from(["crm-import-worker", "migrate"]);
        assert!(matches!(cli.command, Some(Command::Migrate)));
    }

    #[test]
    fn test_cli_no_command_defaults_to_none() {
        let cli = Cli::parse_from(["crm-import-worker"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_import_parses_overrides() {
        let cli = Cli::parse_from([
            "crm-import-worker",
            "import",
            "leads.xlsx",
            "--rows",
            "1-10",
            "--org-name",
            "2",
            "--emails",
            "3,4",
            "--dry-run",
        ]);
        let Some(Command::Import(args)) = cli.command else {
            panic!("expected import command");
        };
        assert_eq!(args.file, PathBuf::from("leads.xlsx"));
        assert_eq!(args.rows, "1-10");
        assert_eq!(args.org_name, Some(2));
        assert_eq!(args.emails, Some(vec![3, 4]));
        assert!(args.phones.is_none());
        assert!(args.dry_run);
    }

    #[test]
    fn test_cli_normalize_parses() {
        let cli = Cli::parse_from(["crm-import-worker", "normalize", "in.xlsx", "out.csv"]);
        assert!(matches!(cli.command, Some(Command::Normalize { .. })));
    }

    #[test]
    fn test_apply_swaps_single_columns() {
        let mut mapping = classify(&headers(&["Company", "City", "Email"]));
        assert_eq!(mapping.single(SingleField::OrgName), Some(0));

        let args = ImportArgs {
            org_name: Some(1),
            city: Some(0),
            ..Default::default()
        };
        args.apply(&mut mapping).unwrap();

        assert_eq!(mapping.single(SingleField::OrgName), Some(1));
        assert_eq!(mapping.single(SingleField::City), Some(0));
    }

    #[test]
    fn test_apply_multi_overrides_respect_singles() {
        let mut mapping = classify(&headers(&["Company", "Email", "Mobile"]));
        let args = ImportArgs {
            emails: Some(vec![0, 1, 2]),
            ..Default::default()
        };
        args.apply(&mut mapping).unwrap();

        assert_eq!(mapping.emails().iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert!(mapping.phones().is_empty());
    }

    #[test]
    fn test_apply_rejects_out_of_range() {
        let mut mapping = classify(&headers(&["Company", "Email"]));
        let args = ImportArgs {
            website: Some(9),
            ..Default::default()
        };
        assert_eq!(
            args.apply(&mut mapping),
            Err(MappingError::ColumnOutOfRange { index: 9, count: 2 })
        );
    }
}
