use clap::Parser;
use std::path::PathBuf;

/// Portable bundle builder for the Hand Gesture Recognition app
///
/// Copies app.py, utils/, model/ and README.md from the working directory
/// into HandGestureRecognition_Portable/, adds requirements.txt, setup.bat,
/// run.bat and PORTABLE_README.txt, then zips the folder into
/// HandGestureRecognition_Portable.zip. Previous output is replaced.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Working directory to package (defaults to the current directory)
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Bundle config file (defaults to portable.toml in the working directory)
    #[arg(long, value_name = "PATH", env = "GESTURE_PACK_CONFIG")]
    pub config: Option<PathBuf>,
}
