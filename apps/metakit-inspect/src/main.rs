use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use metakit::{Element, Introspector, TypeRef};
use metakit_bootstrap::{AppConfig, CliArgs};
use mimalloc::MiMalloc;

use std::io::Write;
use std::path::PathBuf;

mod catalog;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// metakit-inspect - query the type table and annotations of the demo catalog
#[derive(Parser)]
#[command(name = "metakit-inspect")]
#[command(about = "Inspect registered types, hierarchies and annotations")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List every registered type
    Types,
    /// Print the type hierarchy walk starting at TYPE
    Walk {
        /// Type name, full path or unique short name
        #[arg(value_name = "TYPE")]
        ty: String,
        #[arg(long)]
        superclasses: bool,
        #[arg(long)]
        interfaces: bool,
    },
    /// Print the annotations found on TYPE or one of its members
    Annotations(AnnotationArgs),
}

#[derive(Args)]
struct AnnotationArgs {
    /// Type name, full path or unique short name
    #[arg(value_name = "TYPE")]
    ty: String,
    /// Inspect a field declared by TYPE
    #[arg(long, group = "member")]
    field: Option<String>,
    /// Inspect a method declared by TYPE
    #[arg(long, group = "member")]
    method: Option<String>,
    /// Inspect a constructor declared by TYPE
    #[arg(long, group = "member")]
    constructor: Option<String>,
    /// Also inspect the declaring type of a member
    #[arg(long)]
    fallback: bool,
    /// Also inspect equivalent members of supertypes
    #[arg(long)]
    overridden: bool,
    #[arg(long)]
    superclasses: bool,
    #[arg(long)]
    interfaces: bool,
    /// Expand annotations on annotation types
    #[arg(long)]
    meta: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // 1) defaults -> 2) YAML (if provided) -> 3) env (METAKIT__*) -> 4) CLI overrides
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.clone().unwrap_or_default();
    metakit_bootstrap::init_logging(&logging_config, &config.log_base_dir());

    if args.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let mk = metakit::init(config.introspection.clone())
        .context("Failed to build the type table")?;
    tracing::debug!(types = mk.table().len(), "metakit-inspect ready");

    let mut out = std::io::stdout().lock();
    dispatch(mk, cli.command.unwrap_or(Commands::Types), &mut out)
}

fn dispatch(mk: &Introspector, command: Commands, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Types => list_types(mk, out),
        Commands::Walk {
            ty,
            superclasses,
            interfaces,
        } => walk(mk, &ty, superclasses, interfaces, out),
        Commands::Annotations(a) => annotations(mk, &a, out),
    }
}

fn resolve<'i>(mk: &'i Introspector, name: &str) -> Result<&'i TypeRef> {
    mk.table()
        .lookup(name)
        .ok_or_else(|| anyhow!("unknown or ambiguous type '{name}'"))
}

fn list_types(mk: &Introspector, out: &mut impl Write) -> Result<()> {
    for ty in mk.table().iter() {
        writeln!(out, "{:<12} {}", ty.kind().to_string(), ty.key())?;
    }
    Ok(())
}

fn walk(
    mk: &Introspector,
    name: &str,
    superclasses: bool,
    interfaces: bool,
    out: &mut impl Write,
) -> Result<()> {
    let mut query = mk.on_type(resolve(mk, name)?);
    if superclasses {
        query = query.traversing_superclasses();
    }
    if interfaces {
        query = query.traversing_interfaces();
    }
    for ty in query.types()?.iter() {
        writeln!(out, "{ty}")?;
    }
    Ok(())
}

fn subject(ty: &TypeRef, a: &AnnotationArgs) -> Result<Element> {
    let owner = ty.key();
    if let Some(f) = &a.field {
        let field = ty
            .declared_field(f)
            .ok_or_else(|| anyhow!("{owner} declares no field '{f}'"))?;
        return Ok(field.into());
    }
    if let Some(m) = &a.method {
        let method = ty
            .declared_method_named(m)
            .ok_or_else(|| anyhow!("{owner} declares no method '{m}'"))?;
        return Ok(method.into());
    }
    if let Some(c) = &a.constructor {
        let constructor = ty
            .constructors()
            .find(|k| k.name() == c.as_str())
            .ok_or_else(|| anyhow!("{owner} declares no constructor '{c}'"))?;
        return Ok(constructor.into());
    }
    Ok(ty.clone().into())
}

fn annotations(mk: &Introspector, a: &AnnotationArgs, out: &mut impl Write) -> Result<()> {
    let ty = resolve(mk, &a.ty)?;
    let mut query = mk.on(subject(ty, a)?);
    if a.fallback {
        query = query.falling_back_on_declaring_type();
    }
    if a.overridden {
        query = query.traversing_overridden_members();
    }
    if a.superclasses {
        query = query.traversing_superclasses();
    }
    if a.interfaces {
        query = query.traversing_interfaces();
    }
    if a.meta {
        query = query.including_meta_annotations();
    }
    for annotation in query.find_all()?.iter() {
        writeln!(out, "{annotation}")?;
    }
    Ok(())
}
