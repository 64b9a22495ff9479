use clap::{App, Arg, SubCommand};
use faceballot::Policy;
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

mod command_e2e;
mod command_keygen;
mod command_seal;
mod command_template;
mod demo_model;

use command_e2e::command_e2e;
use command_keygen::command_keygen;
use command_seal::{command_open, command_seal, command_verify};
use command_template::{command_enroll, command_match};

#[derive(PartialEq, PartialOrd, Copy, Clone, Debug)]
#[repr(u8)]
pub enum Verbosity {
    Silent = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
}

impl From<Verbosity> for LevelFilter {
    fn from(verbosity: Verbosity) -> Self {
        match verbosity {
            Verbosity::Silent => LevelFilter::Off,
            Verbosity::Error => LevelFilter::Error,
            Verbosity::Warn => LevelFilter::Warn,
            Verbosity::Info => LevelFilter::Info,
            Verbosity::Debug => LevelFilter::Debug,
        }
    }
}

fn main() {
    let matches = App::new("FaceBallot CLI")
        .version("1.0")
        .author("Patrick Hayes <patrick.d.hayes@gmail.com>")
        .about("Face-verified, sealed vote casting")
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .global(true)
                .help("Sets the level of verbosity"),
        )
        .arg(
            Arg::with_name("q")
                .short("q")
                .multiple(true)
                .global(true)
                .conflicts_with("v")
                .help("Log less; -qq turns logging off"),
        )
        .arg(
            Arg::with_name("policy")
                .long("policy")
                .takes_value(true)
                .global(true)
                .help("Policy file in JSON format - can also be set with FACEBALLOT_POLICY"),
        )
        .subcommand(
            SubCommand::with_name("keygen")
                .about("Generate an election keypair")
                .arg(
                    Arg::with_name("out")
                        .long("out")
                        .takes_value(true)
                        .help("Directory to write public.pem and private.pem into. Prints to stdout if omitted."),
                ),
        )
        .subcommand(
            SubCommand::with_name("seal")
                .about("Encrypt a choice to an election public key")
                .arg(
                    Arg::with_name("CHOICE")
                        .index(1)
                        .required(true)
                        .help("Candidate id"),
                )
                .arg(
                    Arg::with_name("public-key")
                        .long("public-key")
                        .takes_value(true)
                        .required(true)
                        .help("Election public key in PEM format"),
                ),
        )
        .subcommand(
            SubCommand::with_name("open")
                .about("Decrypt a sealed vote")
                .arg(
                    Arg::with_name("SEALED")
                        .index(1)
                        .required(true)
                        .help("Sealed vote file in JSON format"),
                )
                .arg(
                    Arg::with_name("private-key")
                        .long("private-key")
                        .takes_value(true)
                        .required(true)
                        .help("Election private key in PEM format"),
                ),
        )
        .subcommand(
            SubCommand::with_name("verify")
                .about("Check a sealed vote against its integrity hash")
                .arg(
                    Arg::with_name("SEALED")
                        .index(1)
                        .required(true)
                        .help("Sealed vote file in JSON format"),
                )
                .arg(
                    Arg::with_name("HASH")
                        .index(2)
                        .required(false)
                        .help("Receipt hash to compare against"),
                ),
        )
        .subcommand(
            SubCommand::with_name("enroll")
                .about("Build an enrollment template from an embedding")
                .arg(
                    Arg::with_name("EMBEDDING")
                        .index(1)
                        .required(true)
                        .help("Embedding file: a JSON array of numbers"),
                )
                .arg(
                    Arg::with_name("out")
                        .long("out")
                        .takes_value(true)
                        .required(true)
                        .help("Where to write the CBOR template"),
                ),
        )
        .subcommand(
            SubCommand::with_name("match")
                .about("Compare an embedding against an enrollment template")
                .arg(
                    Arg::with_name("TEMPLATE")
                        .index(1)
                        .required(true)
                        .help("Template file in CBOR or JSON format"),
                )
                .arg(
                    Arg::with_name("EMBEDDING")
                        .index(2)
                        .required(true)
                        .help("Embedding file: a JSON array of numbers"),
                ),
        )
        .subcommand(
            SubCommand::with_name("e2e")
                .about("Run a complete election in memory with a synthetic face model")
                .arg(
                    Arg::with_name("voters")
                        .long("voters")
                        .takes_value(true)
                        .default_value("3")
                        .help("Number of voters"),
                ),
        )
        .get_matches();

    let verbosity = match (matches.occurrences_of("q"), matches.occurrences_of("v")) {
        (0, 0) => Verbosity::Warn,
        (0, 1) => Verbosity::Info,
        (0, _) => Verbosity::Debug,
        (1, _) => Verbosity::Error,
        _ => Verbosity::Silent,
    };
    init_logging(verbosity);

    let policy = load_policy(matches.value_of("policy"));
    log::debug!("policy: {:?}", policy);

    // Subcommands
    if let Some(matches) = matches.subcommand_matches("keygen") {
        command_keygen(matches);
    }
    if let Some(matches) = matches.subcommand_matches("seal") {
        command_seal(matches);
    }
    if let Some(matches) = matches.subcommand_matches("open") {
        command_open(matches);
    }
    if let Some(matches) = matches.subcommand_matches("verify") {
        command_verify(matches);
    }
    if let Some(matches) = matches.subcommand_matches("enroll") {
        command_enroll(matches, &policy);
    }
    if let Some(matches) = matches.subcommand_matches("match") {
        command_match(matches, &policy);
    }
    if let Some(matches) = matches.subcommand_matches("e2e") {
        command_e2e(matches, &policy, verbosity);
    }
}

/// Log to stderr, or follow FACEBALLOT_LOG_CONFIG if it names a log4rs config file
fn init_logging(verbosity: Verbosity) {
    if let Ok(path) = std::env::var("FACEBALLOT_LOG_CONFIG") {
        if let Err(e) = log4rs::init_file(expand(&path), Default::default()) {
            eprintln!("faceballot: unable to load log config {}: {}", path, e);
            std::process::exit(1);
        }
        return;
    }

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{l:<5} {t} - {m}{n}")))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(verbosity.into()));

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("faceballot: invalid log config: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = log4rs::init_config(config) {
        eprintln!("faceballot: unable to initialise logging: {}", e);
        std::process::exit(1);
    }
}

// --policy wins over FACEBALLOT_POLICY; the threshold and confidence variables apply either way
fn load_policy(path: Option<&str>) -> Policy {
    if let Some(path) = path {
        std::env::set_var("FACEBALLOT_POLICY", expand(path));
    }

    Policy::from_env().unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    })
}

pub fn expand(input: &str) -> String {
    shellexpand::tilde(input).into_owned()
}

pub fn read_file(command: &str, filename: &str) -> Vec<u8> {
    std::fs::read(expand(filename)).unwrap_or_else(|e| {
        eprintln!("faceballot {}: unable to read {}: {}", command, filename, e);
        std::process::exit(1);
    })
}

pub fn write_file(command: &str, filename: &str, contents: &[u8]) {
    if let Err(e) = std::fs::write(expand(filename), contents) {
        eprintln!("faceballot {}: unable to write {}: {}", command, filename, e);
        std::process::exit(1);
    }
}
