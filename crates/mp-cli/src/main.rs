use clap::{Args as ClapArgs, Parser as ClapParser, Subcommand};
use mp_core::{ErrorKind, Parser, ParserOptions, Registry, SchemaDoc, TracingSink};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(ClapParser, Debug)]
#[command(
    name = "mp-cli",
    about = "Apply declarative parsing schemas to XML-derived JSON payloads",
    version
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Parse a payload file, or every .json file in a directory
    Parse(ParseArgs),
    /// Compile a schema document and report problems
    Check(CheckArgs),
}

#[derive(ClapArgs, Debug)]
struct ParseArgs {
    /// Payload file or directory of payload files
    path: PathBuf,
    /// Schema document (.json)
    #[arg(long)]
    schema: PathBuf,
    /// Skip unparsed-property tracking
    #[arg(long, default_value_t = false)]
    no_unparsed: bool,
    /// Optional output .json path to write; otherwise prints to stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct CheckArgs {
    /// Schema document (.json)
    #[arg(long)]
    schema: PathBuf,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Parse(a) => cmd_parse(a),
        Cmd::Check(a) => cmd_check(a),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Schema => 2,
        ErrorKind::Payload => 3,
        ErrorKind::Conversion => 4,
        ErrorKind::Io => 5,
    }
}

fn fail(err: mp_core::Error) -> ! {
    eprintln!("error: {}", err);
    std::process::exit(exit_code(err.kind()));
}

fn load_parser(schema: &Path, options: ParserOptions) -> Parser {
    let doc = SchemaDoc::from_path(schema).unwrap_or_else(|e| fail(e));
    let compiled = doc
        .compile(&Registry::with_builtins())
        .unwrap_or_else(|e| fail(e));
    Parser::compile(compiled, options).with_sink(TracingSink)
}

fn parse_file(parser: &Parser, path: &Path) -> mp_core::Result<serde_json::Value> {
    let text = std::fs::read_to_string(path).map_err(|source| mp_core::Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    parser.parse_str(&text).map(serde_json::Value::Object)
}

fn cmd_parse(args: ParseArgs) {
    let options = ParserOptions {
        track_unparsed: !args.no_unparsed,
    };
    let parser = load_parser(&args.schema, options);
    let p = args.path.as_path();
    let value = if p.is_dir() {
        let mut map = serde_json::Map::new();
        let entries = WalkDir::new(p)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .flatten()
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("json"));
        for entry in entries {
            let name = entry.file_name().to_string_lossy().into_owned();
            let parsed = parse_file(&parser, entry.path()).unwrap_or_else(|e| {
                tracing::debug!(file = %name, error = %e, "payload failed to parse");
                serde_json::json!({ "$error": e.to_string() })
            });
            map.insert(name, parsed);
        }
        serde_json::Value::Object(map)
    } else {
        parse_file(&parser, p).unwrap_or_else(|e| fail(e))
    };

    let rendered = serde_json::to_string_pretty(&value).unwrap_or_else(|e| fail(e.into()));
    if let Some(out) = args.out {
        std::fs::write(&out, rendered).unwrap_or_else(|e| {
            eprintln!("error writing: {}", e);
            std::process::exit(5);
        });
    } else {
        println!("{}", rendered);
    }
}

fn cmd_check(args: CheckArgs) {
    let parser = load_parser(&args.schema, ParserOptions::suppressed());
    let schema = parser.schema();
    schema.validate().unwrap_or_else(|e| fail(e));
    println!(
        "ok: {} fields{}",
        schema.fields().len(),
        if schema.has_preprocessor() {
            " (with preprocessor)"
        } else {
            ""
        }
    );
}
