use std::process;

use ariadne::{Label, Report, ReportKind, Source};
use haaspost::{export, ConfigParseError, Destination, ExportError, Job};

#[derive(Debug)]
enum Error {
    Export(ExportError),
}

impl From<ExportError> for Error {
    fn from(e: ExportError) -> Self {
        Error::Export(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Export(e) => write!(f, "{}", e),
        }
    }
}

fn main() {
    haaspost::init_logging();

    if let Err(e) = run() {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Error> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: haaspost <job.json> [output.nc|-] [options...]");
        eprintln!();
        eprintln!("Options:");
        eprintln!("  --no-header --no-comments --line-numbers --no-show-editor");
        eprintln!("  --precision=N --preamble=TEXT --postamble=TEXT --inches");
        eprintln!("  --no-modal --no-axis-modal --no-tlo");
        eprintln!();
        eprintln!("Example:");
        eprintln!("  haaspost job.json part.nc --line-numbers --inches");
        process::exit(1);
    }

    let job = Job::from_file(&args[1])?;
    let destination = Destination::from(args.get(2).map(String::as_str).unwrap_or("-"));

    // Options on the command line replace the ones stored in the job
    let options = if args.len() > 3 {
        args[3..].iter().map(|a| quote(a)).collect::<Vec<_>>().join(" ")
    } else {
        job.options.clone()
    };

    let gcode = match export(&job.nodes, &destination, &options, None) {
        Ok(gcode) => gcode,
        Err(ExportError::Config(e)) => {
            report_options_error(&options, &e);
            process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    match destination {
        Destination::NoFile => print!("{}", gcode),
        Destination::File(_) => eprintln!("Generated: {}", destination),
    }

    Ok(())
}

/// Keep arguments with spaces together when re-joining them
fn quote(arg: &str) -> String {
    match arg.split_once('=') {
        Some((key, value)) if value.contains(char::is_whitespace) => {
            format!("{}=\"{}\"", key, value.replace('"', "\\\""))
        }
        _ if arg.contains(char::is_whitespace) => format!("\"{}\"", arg.replace('"', "\\\"")),
        _ => arg.to_string(),
    }
}

fn report_options_error(options: &str, error: &ConfigParseError) {
    let report = Report::build(ReportKind::Error, "options", error.span().start)
        .with_message("invalid post-processor options")
        .with_label(Label::new(("options", error.span())).with_message(error.to_string()))
        .finish();
    if report.eprint(("options", Source::from(options))).is_err() {
        eprintln!("{}", error);
    }
}
