use std::path::PathBuf;

use anyhow::bail;
use bakeweave::Parser;
use bakeweave::siggen;
use bakeweave_datasmart::DataSmart;
use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;

/// Parse a BitBake file and print variables from the resulting datastores
#[derive(ClapParser)]
#[clap(version = "1.0")]
struct Opts {
    /// Recipe, class, include or configuration file
    file: PathBuf,

    /// Variables to print (default: every variable)
    vars: Vec<String>,

    /// Print this flag instead of the value
    #[clap(long)]
    flag: Option<String>,

    /// Colon-separated search path (default: $BBPATH)
    #[clap(long)]
    bbpath: Option<String>,

    /// Configuration files parsed, in order, before the file itself
    #[clap(long = "conf")]
    confs: Vec<PathBuf>,

    /// Only print this context; "" is the default context
    #[clap(long)]
    variant: Option<String>,
}

fn print_vars(d: &DataSmart, opts: &Opts) -> anyhow::Result<()> {
    let vars = match opts.vars.is_empty() {
        true => d.keys()?,
        false => opts.vars.clone(),
    };

    for var in vars {
        let value = match &opts.flag {
            Some(flag) => d.get_var_flag(&var, flag)?,
            None => d.get_var(&var)?,
        };
        match (value, &opts.flag) {
            (Some(value), Some(flag)) => println!("{var}[{flag}]=\"{value}\""),
            (Some(value), None) => println!("{var}=\"{value}\""),
            (None, _) if !opts.vars.is_empty() => println!("# {var} is not set"),
            (None, _) => {}
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opts = Opts::parse();

    let mut base = DataSmart::new();
    if let Some(bbpath) = opts.bbpath.clone().or_else(|| std::env::var("BBPATH").ok()) {
        base.set_var("BBPATH", bbpath)?;
    }

    for conf in &opts.confs {
        let mut ret = Parser::new().handle(conf, &base)?;
        if let Some(d) = ret.swap_remove("") {
            base = d;
        }
    }

    let parser = Parser::new().with_signature_generator(siggen::init(&base)?);
    let contexts = parser.handle(&opts.file, &base)?;

    if let Some(variant) = &opts.variant {
        let Some(d) = contexts.get(variant) else {
            bail!(
                "no context {variant:?}; available: {:?}",
                contexts.keys().collect::<Vec<_>>()
            );
        };
        return print_vars(d, &opts);
    }

    let multiple = contexts.len() > 1;
    for (name, d) in &contexts {
        if multiple {
            println!("# context {name:?}");
        }
        print_vars(d, &opts)?;
    }

    Ok(())
}
