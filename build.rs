// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: package atom
fn package_arg() -> Arg {
    Arg::new("package")
        .required(true)
        .help("Package to act on (e.g. binutils, binutils/2.44 or binutils/2.44-1)")
}

/// Common arguments: build option switches
fn option_args() -> [Arg; 2] {
    [
        Arg::new("with")
            .long("with")
            .value_name("OPTION")
            .action(ArgAction::Append)
            .help("Enable a build option (repeatable)"),
        Arg::new("without")
            .long("without")
            .value_name("OPTION")
            .action(ArgAction::Append)
            .help("Disable a build option (repeatable)"),
    ]
}

fn flag(name: &'static str, short: char, help: &'static str) -> Arg {
    Arg::new(name)
        .short(short)
        .long(name)
        .global(true)
        .action(ArgAction::SetTrue)
        .help(help)
}

fn build_cli() -> Command {
    Command::new("alpaca")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Aleya Project")
        .about("AlpaCA - The Aleya Package Configuration Assistant")
        .subcommand_required(false)
        .arg(flag("verbose", 'v', "Enable verbose output"))
        .arg(flag("debug", 'd', "Enable debug output"))
        .arg(flag("quiet", 'q', "Limit build and copy output to errors only"))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .global(true)
                .help("Configuration file to use instead of the default lookup"),
        )
        .subcommand(
            Command::new("install")
                .about("Install a package")
                .arg(package_arg())
                .arg(
                    Arg::new("build")
                        .short('b')
                        .long("build")
                        .action(ArgAction::SetTrue)
                        .help("Build the package from source, even if a prebuilt binary is available"),
                )
                .args(option_args()),
        )
        .subcommand(
            Command::new("info")
                .about("Show recipe information and the binary hash of a package")
                .arg(package_arg())
                .args(option_args()),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("alpaca.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
