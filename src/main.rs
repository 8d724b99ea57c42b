mod ass;
mod dialogue;
mod error;
mod git;
mod parser;
mod picker;
mod processor;
mod qc;
mod serialiser;

use crate::ass::{DialogueEvent, RefFormat};
use crate::parser::Parser;
use crate::picker::{KeepAll, Prompt, ReferencePicker};
use crate::serialiser::{Header, RefOptions};

use std::io;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();
    match run(Cli::parse()) {
        Ok(()) => (),
        Err(err) => {
            eprintln!("An error occurred: {}", err);
            for cause in err.chain().skip(1) {
                eprintln!("    {}", cause);
            }
            process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(ClapParser)]
#[command(name = "qc2md", about = "Convert mpvQC reports to markdown")]
struct Cli {
    #[arg(value_name = "FILENAME", help = "The mpvQC report to convert.")]
    filename: PathBuf,
    #[arg(
        short,
        long,
        help = "Add quotation blocks for line references above report entries."
    )]
    refs: bool,
    #[arg(
        short,
        long,
        help = "Group most notes together in chronological order."
    )]
    chrono: bool,
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Dialogue file to source references from, where appropriate."
    )]
    dialogue: Option<PathBuf>,
    #[arg(
        long,
        value_enum,
        default_value_t = RefFormat::Full,
        help = "How to format imported dialogue lines."
    )]
    ref_format: RefFormat,
    #[arg(
        short,
        long,
        help = "Ask which line to quote when several dialogue lines match a note."
    )]
    pick: bool,
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "The file to write to. Defaults to the report name with a .md extension, '-' writes to standard output."
    )]
    output: Option<String>,
    #[arg(long, help = "Do not look up the current git commit.")]
    no_git: bool,
}

impl Cli {
    fn output_path(&self) -> String {
        match &self.output {
            Some(output) => output.clone(),
            None => self.filename.with_extension("md").display().to_string(),
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let data = std::fs::read_to_string(&cli.filename)
        .context(format!("Failed to open report: '{}'", cli.filename.display()))?;

    let parser = Parser::new()?;
    let report = parser
        .parse(&data)
        .context(format!("Failed to parse report: '{}'", cli.filename.display()))?;
    if report.entries.is_empty() {
        warn!("'{}' contains no report entries", cli.filename.display());
    }

    let events = load_events(&cli)?;

    let commit = if cli.no_git {
        None
    } else {
        git::head_commit(report_dir(&cli.filename))
    };
    let header = Header {
        artifact: report.artifact,
        commit,
    };

    let opts = processor::ProcessOpts { chrono: cli.chrono };
    let groups = processor::categorize(report.entries, &opts);

    let mut picker: Box<dyn ReferencePicker> = if cli.pick {
        Box::new(Prompt::new(cli.ref_format))
    } else {
        Box::new(KeepAll)
    };
    let refs = if cli.refs {
        Some(RefOptions {
            events: &events,
            format: cli.ref_format,
            picker: picker.as_mut(),
        })
    } else {
        None
    };

    let output = cli.output_path();
    if output == "-" {
        let stdout = io::stdout();
        let mut dst = stdout.lock();
        serialiser::write_markdown(&mut dst, &groups, &header, refs)?;
    } else {
        serialiser::serialise(&groups, &header, refs, &output)
            .context(format!("Failed to write markdown: '{}'", output))?;
        info!("Wrote '{}'", output);
    }

    Ok(())
}

/// Dialogue is only read when references were requested and the file exists.
fn load_events(cli: &Cli) -> Result<Vec<DialogueEvent>> {
    let path = match (&cli.dialogue, cli.refs) {
        (Some(path), true) => path,
        (Some(_), false) => {
            warn!("--dialogue has no effect without --refs");
            return Ok(Vec::new());
        }
        _ => return Ok(Vec::new()),
    };
    if !path.exists() {
        warn!(
            "Dialogue file '{}' does not exist, writing empty references",
            path.display()
        );
        return Ok(Vec::new());
    }
    dialogue::load_dialogue(path)
}

fn report_dir(filename: &Path) -> &Path {
    match filename.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    #[test]
    fn default_options() {
        let cli = Cli::parse_from(["qc2md", "qc/ep01.txt"]);

        assert!(!cli.refs);
        assert!(!cli.chrono);
        assert!(!cli.pick);
        assert!(!cli.no_git);
        assert_eq!(cli.ref_format, RefFormat::Full);
        assert_eq!(cli.output_path(), Path::new("qc/ep01.md").display().to_string());
    }

    #[test]
    fn explicit_options() {
        let cli = Cli::parse_from([
            "qc2md",
            "ep01.txt",
            "-r",
            "-c",
            "-d",
            "ep01.ass",
            "--ref-format",
            "text",
            "-o",
            "-",
        ]);

        assert!(cli.refs);
        assert!(cli.chrono);
        assert_eq!(cli.dialogue, Some(PathBuf::from("ep01.ass")));
        assert_eq!(cli.ref_format, RefFormat::Text);
        assert_eq!(cli.output_path(), "-");
    }

    #[test]
    fn unknown_ref_format_is_rejected() {
        assert!(Cli::try_parse_from(["qc2md", "ep01.txt", "--ref-format", "srt"]).is_err());
    }

    #[test]
    fn report_dir_of_bare_file_name() {
        assert_eq!(report_dir(Path::new("ep01.txt")), Path::new("."));
        assert_eq!(report_dir(Path::new("qc/ep01.txt")), Path::new("qc"));
    }

    #[test]
    fn end_to_end_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("ep01.txt");
        let dialogue = dir.path().join("ep01.ass");
        std::fs::write(
            &report,
            "[FILE]\npath : /videos/ep01.mkv\n\n[DATA]\n\
             [00:00:01] [Phrasing] stiff\n\
             [00:00:02] [Typeset] kerning\n\
             # total lines: 2\n",
        )
        .unwrap();
        std::fs::write(
            &dialogue,
            "[Events]\n\
             Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n\
             Dialogue: 0,0:00:00.50,0:00:01.50,Default,,0,0,0,,How do you do.\n",
        )
        .unwrap();

        let args: Vec<OsString> = vec![
            "qc2md".into(),
            report.clone().into(),
            "--refs".into(),
            "--chrono".into(),
            "--dialogue".into(),
            dialogue.clone().into(),
            "--ref-format".into(),
            "text".into(),
            "--no-git".into(),
        ];
        let cli = Cli::parse_from(args);
        run(cli).unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("ep01.md")).unwrap(),
            "Using artifact `ep01.mkv`\n\
             \n\
             ## Script\n\
             > How do you do.\n\
             - [ ] [`00:00:01` - **Phrasing**]: stiff\n\
             \n\
             ## Typeset\n\
             - [ ] [`00:00:02`]: kerning\n\
             \n"
        );
    }
}
