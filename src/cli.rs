use clap::Parser;

use crate::zip::{GlobSelector, MemberSelector, is_license_path};

#[derive(Parser, Debug)]
#[command(name = "nuget-notices")]
#[command(version)]
#[command(about = "Print license and notice files from NuGet packages", long_about = None)]
#[command(after_help = "Examples:\n  \
  nuget-notices newtonsoft.json.13.0.3.nupkg     print LICENSE/NOTICE members\n  \
  nuget-notices -l foo.nupkg bar.nupkg           list members of both packages\n  \
  nuget-notices -i '*.md' -x 'docs/*' foo.nupkg  print matching members instead")]
pub struct Cli {
    /// Package or ZIP archive paths
    #[arg(value_name = "FILES", required = true)]
    pub files: Vec<String>,

    /// List members (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List members verbosely
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Print members matching these patterns instead of license files
    #[arg(short = 'i', long = "include", value_name = "PATTERN")]
    pub include: Vec<String>,

    /// Exclude members matching these patterns
    #[arg(short = 'x', long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Quiet mode (-q => no warnings, -qq => no headers either)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Number of archives loaded and parsed at the same time
    #[arg(
        short = 'j',
        long = "jobs",
        value_name = "N",
        default_value_t = 4,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub jobs: u16,
}

impl Cli {
    pub fn is_listing(&self) -> bool {
        self.list || self.verbose
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// How many archives may be held in memory at once.
    pub fn jobs(&self) -> usize {
        usize::from(self.jobs)
    }

    /// The member selection described by `-i`/`-x`.
    pub fn selection(&self) -> Selection {
        Selection {
            license_only: self.include.is_empty(),
            globs: GlobSelector::new(self.include.clone(), self.exclude.clone()),
        }
    }
}

/// License files by default, or the `-i` patterns when given; `-x` applies to both.
#[derive(Debug, Clone)]
pub struct Selection {
    license_only: bool,
    globs: GlobSelector,
}

impl MemberSelector for Selection {
    fn matches(&self, name: &str) -> bool {
        (!self.license_only || is_license_path(name)) && self.globs.matches(name)
    }
}
