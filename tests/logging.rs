use std::sync::Mutex;

use log::{Level, LevelFilter, Log, Metadata, Record};

use theory_dd::formula::Formula;
use theory_dd::solver::DiffLogicSolver;
use theory_dd::tdd::{TddOptions, TheoryBdd, TheoryDD};

struct Collector {
    records: Mutex<Vec<(String, Level, String)>>,
}

impl Log for Collector {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut records) = self.records.lock() {
            records.push((record.target().to_string(), record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static COLLECTOR: Collector = Collector {
    records: Mutex::new(Vec::new()),
};

// The only test in this binary: it owns the global logger.
#[test]
fn test_build_logs_to_the_given_target() -> color_eyre::Result<()> {
    log::set_logger(&COLLECTOR).map_err(|e| color_eyre::eyre::eyre!("{}", e))?;
    log::set_max_level(LevelFilter::Trace);

    let dir = tempfile::tempdir()?;
    let phi = Formula::parse("(or (< (- x y) 0) (< (- y x) 0))")?;
    let options = TddOptions {
        log_target: "my_app::tdd".to_string(),
        ..TddOptions::default()
    };
    let (tdd, _) = TheoryBdd::build(&phi, &mut DiffLogicSolver::new(), options)?;
    tdd.save_to_folder(dir.path())?;

    let records = COLLECTOR.records.lock().map_err(|e| color_eyre::eyre::eyre!("{}", e))?;
    let ours: Vec<&(String, Level, String)> = records.iter().filter(|(target, _, _)| target == "my_app::tdd").collect();

    assert!(ours.iter().any(|(_, level, msg)| *level == Level::Info && msg.starts_with("Building bdd T-DD")));
    assert!(ours.iter().any(|(_, _, msg)| msg.starts_with("All-SMT:")));
    assert!(ours.iter().any(|(_, _, msg)| msg.starts_with("Saved bdd T-DD")));
    assert!(records.iter().all(|(target, _, _)| target != "theory_dd"));
    Ok(())
}
