// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("binresolve")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Conary Contributors")
        .about("Decide where every package binary of a dependency graph comes from")
        .subcommand_required(true)
        .subcommand(
            Command::new("resolve")
                .about("Resolve the binaries of a dependency graph")
                .arg(
                    Arg::new("graph")
                        .short('g')
                        .long("graph")
                        .required(true)
                        .value_name("FILE")
                        .help("Graph file (TOML)"),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("Configuration file (default: ~/.binresolve/config.toml when present)"),
                )
                .arg(
                    Arg::new("build")
                        .short('b')
                        .long("build")
                        .num_args(0..)
                        .value_name("VALUE")
                        .help("Build policy: no value forces everything; otherwise never, missing, outdated, or a glob"),
                )
                .arg(
                    Arg::new("update")
                        .short('u')
                        .long("update")
                        .action(ArgAction::SetTrue)
                        .help("Check remotes for newer binaries of cached packages"),
                )
                .arg(
                    Arg::new("remote")
                        .short('r')
                        .long("remote")
                        .value_name("NAME")
                        .help("Only consult this remote"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the result as JSON"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let out_dir = match env::var("OUT_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=OUT_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = out_dir.join("man");

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

    let man_path = man_dir.join("binresolve.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
