use std::fs;

use test_log::test;

use theory_dd::error::TddError;
use theory_dd::formula::Formula;
use theory_dd::solver::DiffLogicSolver;
use theory_dd::tdd::{TddOptions, TheoryBdd, TheoryDD, TheoryZdd};

const PHI: &str = "(and (or (<= (- a b) 2) (> (- b c) 1)) (or p (< (- a c) 0)) (=> p (>= (- c a) 4)))";

#[test]
fn test_bdd_save_and_load() -> color_eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let phi = Formula::parse(PHI)?;
    let (tdd, _) = TheoryBdd::build(&phi, &mut DiffLogicSolver::new(), TddOptions::default())?;

    tdd.save_to_folder(dir.path())?;
    for file in ["diagram.dd", "abstraction.json", "metadata.json"] {
        assert!(dir.path().join(file).is_file(), "missing {}", file);
    }

    let loaded = TheoryBdd::load_from_folder(dir.path())?;
    assert_eq!(loaded.count_models(), tdd.count_models());
    assert_eq!(loaded.count_nodes(), tdd.count_nodes());
    assert_eq!(loaded.count_vertices(), tdd.count_vertices());
    assert_eq!(loaded.get_mapping(), tdd.get_mapping());
    assert_eq!(loaded.pick_all(), tdd.pick_all());
    Ok(())
}

#[test]
fn test_bdd_with_fresh_atoms_save_and_load() -> color_eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let phi = Formula::parse("(or (and (< (- x y) 0) (< (- y z) 0) (< (- z x) 0)) p)")?;
    let (tdd, _) = TheoryBdd::build(&phi, &mut DiffLogicSolver::with_transitive_lemmas(), TddOptions::default())?;
    tdd.save_to_folder(dir.path())?;

    let loaded = TheoryBdd::load_from_folder(dir.path())?;
    assert_eq!(loaded.qvars(), tdd.qvars());
    assert_eq!(loaded.count_models(), tdd.count_models());
    Ok(())
}

#[test]
fn test_zdd_save_and_load() -> color_eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let phi = Formula::parse(PHI)?;
    let (tdd, _) = TheoryZdd::build(&phi, &mut DiffLogicSolver::new(), TddOptions::default())?;
    tdd.save_to_folder(dir.path())?;

    let loaded = TheoryZdd::load_from_folder(dir.path())?;
    assert_eq!(loaded.count_models(), tdd.count_models());
    assert_eq!(loaded.count_nodes(), tdd.count_nodes());
    assert_eq!(loaded.pick_all(), tdd.pick_all());
    Ok(())
}

#[test]
fn test_constant_diagrams_save_and_load() -> color_eyre::Result<()> {
    for text in ["(or p (not p))", "(and (< (- x y) 0) (< (- y z) 0) (< (- z x) 0))"] {
        let dir = tempfile::tempdir()?;
        let phi = Formula::parse(text)?;
        let (tdd, _) = TheoryBdd::build(&phi, &mut DiffLogicSolver::new(), TddOptions::default())?;
        tdd.save_to_folder(dir.path())?;

        let loaded = TheoryBdd::load_from_folder(dir.path())?;
        assert_eq!(loaded.is_sat(), tdd.is_sat());
        assert_eq!(loaded.is_valid(), tdd.is_valid());
        assert_eq!(loaded.count_models(), tdd.count_models());
    }
    Ok(())
}

#[test]
fn test_load_with_wrong_variant() -> color_eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let phi = Formula::parse(PHI)?;
    let (tdd, _) = TheoryBdd::build(&phi, &mut DiffLogicSolver::new(), TddOptions::default())?;
    tdd.save_to_folder(dir.path())?;

    assert!(matches!(
        TheoryZdd::load_from_folder(dir.path()),
        Err(TddError::InvalidFolder { .. })
    ));
    Ok(())
}

#[test]
fn test_load_from_missing_folder() -> color_eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    assert!(matches!(
        TheoryBdd::load_from_folder(dir.path().join("nope")),
        Err(TddError::InvalidFolder { .. })
    ));
    assert!(matches!(TheoryBdd::load_from_folder(dir.path()), Err(TddError::Io(_))));
    Ok(())
}

#[test]
fn test_load_detects_tampered_metadata() -> color_eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let phi = Formula::parse(PHI)?;
    let (tdd, _) = TheoryBdd::build(&phi, &mut DiffLogicSolver::new(), TddOptions::default())?;
    tdd.save_to_folder(dir.path())?;

    let path = dir.path().join("metadata.json");
    let mut metadata: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
    metadata["model_count"] = serde_json::json!("12345");
    fs::write(&path, serde_json::to_string(&metadata)?)?;

    assert!(matches!(
        TheoryBdd::load_from_folder(dir.path()),
        Err(TddError::InvalidFolder { .. })
    ));
    Ok(())
}

#[test]
fn test_load_detects_tampered_diagram_header() -> color_eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let phi = Formula::parse(PHI)?;
    let (tdd, _) = TheoryBdd::build(&phi, &mut DiffLogicSolver::new(), TddOptions::default())?;
    tdd.save_to_folder(dir.path())?;

    let path = dir.path().join("diagram.dd");
    let text = fs::read_to_string(&path)?;
    let num_vars = tdd.abstraction().len();
    for header in [
        format!("bdd 18446744073709551615 {}", num_vars),
        "bdd 3 18446744073709551615".to_string(),
        "bdd 3 1000000".to_string(),
    ] {
        let body: Vec<&str> = text.lines().skip(1).collect();
        fs::write(&path, format!("{}\n{}\n", header, body.join("\n")))?;
        assert!(TheoryBdd::load_from_folder(dir.path()).is_err(), "{}", header);
    }
    Ok(())
}

#[test]
fn test_zdd_load_rejects_oversized_universe() -> color_eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let phi = Formula::parse(PHI)?;
    let (tdd, _) = TheoryZdd::build(&phi, &mut DiffLogicSolver::new(), TddOptions::default())?;
    tdd.save_to_folder(dir.path())?;

    let path = dir.path().join("diagram.dd");
    let text = fs::read_to_string(&path)?;
    let body: Vec<&str> = text.lines().skip(1).collect();
    fs::write(&path, format!("zdd 0 4000000000\n{}\n", body.join("\n")))?;
    assert!(matches!(
        TheoryZdd::load_from_folder(dir.path()),
        Err(TddError::InvalidFolder { .. })
    ));
    Ok(())
}

#[test]
fn test_graphic_dump() -> color_eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let phi = Formula::parse("(or p (< (- x y) 0))")?;
    let (tdd, _) = TheoryBdd::build(&phi, &mut DiffLogicSolver::new(), TddOptions::default())?;

    let path = dir.path().join("tdd.dot");
    tdd.graphic_dump(&path)?;
    let dot = fs::read_to_string(&path)?;
    assert!(dot.starts_with("graph {"));
    assert!(dot.contains("label=\"p\""));
    assert!(dot.contains("label=\"(<= (- x y) -1)\""));
    Ok(())
}
