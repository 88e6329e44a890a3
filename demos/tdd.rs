use std::path::PathBuf;

use clap::Parser;

use theory_dd::formula::Formula;
use theory_dd::lemma::{save_lemmas, LemmaSource};
use theory_dd::solver::{DiffLogicSolver, TheoryEnumerator};
use theory_dd::tdd::{TddOptions, TheoryBdd, TheoryDD, TheoryZdd};

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Input file with `(assert ...)` commands; the formula is their conjunction.
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Build a ZDD instead of a BDD.
    #[clap(long)]
    zdd: bool,

    /// Read the theory lemmas from this file instead of computing them.
    #[clap(long, value_name = "FILE")]
    lemmas: Option<PathBuf>,

    /// Write the computed theory lemmas to this file.
    #[clap(long, value_name = "FILE")]
    save_lemmas: Option<PathBuf>,

    /// Learn transitivity lemmas during enumeration.
    #[clap(long)]
    transitive: bool,

    /// Node table size (in bits, so the actual size is `2^size` nodes).
    #[clap(long, value_name = "INT", default_value = "20")]
    size: usize,

    /// Save the T-DD into this folder.
    #[clap(long, value_name = "DIR")]
    save: Option<PathBuf>,

    /// Write the diagram in DOT format.
    #[clap(long, value_name = "FILE")]
    dot: Option<PathBuf>,

    /// Print every model.
    #[clap(long)]
    models: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let args = Cli::parse();
    println!("args = {:?}", args);

    let asserts = Formula::parse_script(&std::fs::read_to_string(&args.input)?)?;
    let phi = Formula::big_and(&asserts);
    println!("phi = {}", phi);

    let mut solver = if args.transitive {
        DiffLogicSolver::with_transitive_lemmas()
    } else {
        DiffLogicSolver::new()
    };
    let options = TddOptions {
        lemmas: match &args.lemmas {
            Some(path) => LemmaSource::File(path.clone()),
            None => LemmaSource::Compute,
        },
        storage_bits: args.size,
        ..TddOptions::default()
    };

    let (tdd, diagnostics): (Box<dyn TheoryDD>, _) = if args.zdd {
        let (tdd, diagnostics) = TheoryZdd::build(&phi, &mut solver, options)?;
        (Box::new(tdd), diagnostics)
    } else {
        let (tdd, diagnostics) = TheoryBdd::build(&phi, &mut solver, options)?;
        (Box::new(tdd), diagnostics)
    };

    if let Some(path) = &args.save_lemmas {
        save_lemmas(path, solver.get_theory_lemmas())?;
        println!("Saved {} lemmas to {}", solver.get_theory_lemmas().len(), path.display());
    }

    println!("variant: {}", tdd.variant());
    println!("nodes: {}", tdd.count_nodes());
    println!("vertices: {}", tdd.count_vertices());
    println!("models: {}", tdd.count_models());
    println!("sat: {}, valid: {}", tdd.is_sat(), tdd.is_valid());
    println!("fresh atoms: {}", tdd.qvars().len());
    println!("diagnostics = {}", serde_json::to_string_pretty(&diagnostics.to_json())?);

    if args.models {
        for (i, model) in tdd.pick_all_iter().enumerate() {
            let literals: Vec<String> = model
                .iter()
                .map(|(atom, &value)| if value { atom.to_string() } else { format!("(not {})", atom) })
                .collect();
            println!("model #{}: {}", i + 1, literals.join(" "));
        }
    }

    if let Some(path) = &args.dot {
        tdd.graphic_dump(path)?;
        println!("DOT written to {}", path.display());
    }
    if let Some(path) = &args.save {
        tdd.save_to_folder(path)?;
        println!("T-DD saved to {}", path.display());
    }

    Ok(())
}
