//! Risk filter tests: source/sink reachability, memoization, cycles and
//! parallel determinism.

use sinkhound::analyzer::Analyzer;
use sinkhound::config::AnalyzerConfig;
use sinkhound::ir::builder::ProgramBuilder;
use sinkhound::ir::{FuncId, Instr, Program, Signature};

const CTX: &str = "*github.com/cloudwego/hertz/pkg/app.RequestContext";
const DB: &str = "*gorm.io/gorm.DB";

fn handler_sig() -> Signature {
    Signature::new(
        vec!["context.Context", CTX],
        Vec::<String>::new(),
    )
}

/// A builder preloaded with a main package, one registered handler and the
/// hertz/gorm externals.
struct Fixture {
    b: ProgramBuilder,
    main_fn: FuncId,
    source: FuncId,
    sink: FuncId,
}

impl Fixture {
    fn new() -> Self {
        let mut b = ProgramBuilder::new();
        b.add_package("main", "example.com/cmd", &[]);
        b.add_package("app", "github.com/cloudwego/hertz/pkg/app", &[]);
        b.add_package("gorm", "gorm.io/gorm", &[]);
        let main_fn = b.add_function("example.com/cmd", "main", Signature::default());
        let source = b.add_external_function(
            "github.com/cloudwego/hertz/pkg/app",
            "GetString",
            Signature::new(vec!["string"], vec!["string"]).with_receiver(CTX),
        );
        let sink = b.add_external_function(
            "gorm.io/gorm",
            "Exec",
            Signature::new(vec!["string", "...interface{}"], vec![DB]).with_receiver(DB),
        );
        Self {
            b,
            main_fn,
            source,
            sink,
        }
    }

    fn add_handler(&mut self, name: &str) -> FuncId {
        self.b
            .add_function("example.com/cmd", name, handler_sig())
    }

    fn add_helper(&mut self, name: &str) -> FuncId {
        self.b
            .add_function("example.com/cmd", name, Signature::default())
    }

    fn register(&mut self, handlers: &[FuncId]) {
        let calls = handlers.iter().map(|&h| Instr::call(h)).collect();
        self.b.set_instrs(self.main_fn, calls);
    }

    fn build(self) -> Program {
        self.b.build()
    }
}

fn analyze(program: &Program) -> sinkhound::AnalysisReport {
    let mut analyzer = Analyzer::new(AnalyzerConfig::default()).unwrap();
    analyzer.analyze(program).unwrap()
}

#[test]
fn handler_with_source_only_is_not_risky() {
    let mut fx = Fixture::new();
    let h = fx.add_handler("GetUser");
    fx.register(&[h]);
    let source = fx.source;
    fx.b.set_instrs(h, vec![Instr::call(source)]);
    let program = fx.build();

    let report = analyze(&program);
    assert_eq!(report.active_handlers, vec![h]);
    assert!(report.risky_handlers.is_empty());
}

#[test]
fn handler_with_sink_only_is_not_risky() {
    let mut fx = Fixture::new();
    let h = fx.add_handler("ListUsers");
    fx.register(&[h]);
    let sink = fx.sink;
    fx.b.set_instrs(h, vec![Instr::call(sink)]);
    let program = fx.build();

    let report = analyze(&program);
    assert_eq!(report.active_handlers, vec![h]);
    assert!(report.risky_handlers.is_empty());
}

#[test]
fn full_taint_path_is_reported_exactly_once() {
    let mut fx = Fixture::new();
    let h = fx.add_handler("Search");
    fx.register(&[h]);
    let (source, sink) = (fx.source, fx.sink);
    fx.b.set_instrs(h, vec![Instr::call(source), Instr::call(sink)]);
    let program = fx.build();

    let report = analyze(&program);
    assert_eq!(report.risky_handlers, vec![h]);
}

#[test]
fn source_and_sink_need_not_share_a_path() {
    let mut fx = Fixture::new();
    let h = fx.add_handler("Update");
    let read_input = fx.add_helper("readInput");
    let write_db = fx.add_helper("writeDb");
    fx.register(&[h]);
    let (source, sink) = (fx.source, fx.sink);
    fx.b.set_instrs(h, vec![Instr::call(read_input), Instr::call(write_db)]);
    fx.b.set_instrs(read_input, vec![Instr::call(source)]);
    fx.b.set_instrs(write_db, vec![Instr::call(sink)]);
    let program = fx.build();

    assert_eq!(analyze(&program).risky_handlers, vec![h]);
}

#[test]
fn discovery_reaches_through_deep_helper_chains() {
    let mut fx = Fixture::new();
    let h = fx.add_handler("Deep");
    let a = fx.add_helper("a");
    let b_fn = fx.add_helper("b");
    let c = fx.add_helper("c");
    fx.register(&[h]);
    let (source, sink) = (fx.source, fx.sink);
    fx.b.set_instrs(h, vec![Instr::call(a)]);
    fx.b.set_instrs(a, vec![Instr::call(b_fn)]);
    fx.b.set_instrs(b_fn, vec![Instr::call(c)]);
    fx.b.set_instrs(c, vec![Instr::call(source), Instr::call(sink)]);
    let program = fx.build();

    assert_eq!(analyze(&program).risky_handlers, vec![h]);
}

#[test]
fn terminates_and_detects_through_mutual_recursion() {
    let mut fx = Fixture::new();
    let h = fx.add_handler("Cyclic");
    let f = fx.add_helper("f");
    let g = fx.add_helper("g");
    fx.register(&[h]);
    let (source, sink) = (fx.source, fx.sink);
    fx.b.set_instrs(h, vec![Instr::call(f)]);
    fx.b.set_instrs(f, vec![Instr::call(source), Instr::call(g)]);
    fx.b.set_instrs(g, vec![Instr::call(sink), Instr::call(f)]);
    let program = fx.build();

    assert_eq!(analyze(&program).risky_handlers, vec![h]);
}

#[test]
fn terminates_on_self_recursion() {
    let mut fx = Fixture::new();
    let h = fx.add_handler("Loop");
    let f = fx.add_helper("f");
    fx.register(&[h]);
    let source = fx.source;
    fx.b.set_instrs(h, vec![Instr::call(f)]);
    fx.b.set_instrs(f, vec![Instr::call(f), Instr::call(source)]);
    let program = fx.build();

    // terminates; only a source below, so not risky
    assert!(analyze(&program).risky_handlers.is_empty());
}

#[test]
fn handlers_sharing_a_helper_are_both_risky() {
    let mut fx = Fixture::new();
    let h1 = fx.add_handler("One");
    let h2 = fx.add_handler("Two");
    let shared = fx.add_helper("shared");
    fx.register(&[h1, h2]);
    let (source, sink) = (fx.source, fx.sink);
    fx.b.set_instrs(h1, vec![Instr::call(shared)]);
    fx.b.set_instrs(h2, vec![Instr::call(shared)]);
    fx.b.set_instrs(shared, vec![Instr::call(source), Instr::call(sink)]);
    let program = fx.build();

    let report = analyze(&program);
    let mut risky = report.risky_handlers.clone();
    risky.sort();
    assert_eq!(risky, vec![h1, h2]);
}

#[test]
fn risk_map_holds_one_record_per_function() {
    let mut fx = Fixture::new();
    let h1 = fx.add_handler("One");
    let h2 = fx.add_handler("Two");
    let shared = fx.add_helper("shared");
    fx.register(&[h1, h2]);
    let (source, sink) = (fx.source, fx.sink);
    fx.b.set_instrs(h1, vec![Instr::call(shared)]);
    fx.b.set_instrs(h2, vec![Instr::call(shared)]);
    fx.b.set_instrs(shared, vec![Instr::call(source), Instr::call(sink)]);
    let program = fx.build();

    let mut analyzer = Analyzer::new(AnalyzerConfig::default()).unwrap();
    analyzer.analyze(&program).unwrap();

    let registry = analyzer.registry();
    // shared, source and sink each have exactly one memoized record
    assert_eq!(registry.risk_count(), 3);
    let first = registry.get_risk(shared).unwrap();
    let second = registry.get_risk(shared).unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert!(registry.get_risk(source).unwrap().is_source());
    assert!(registry.get_risk(sink).unwrap().is_sink());
}

#[test]
fn risky_set_is_independent_of_worker_count() {
    fn build() -> (Program, Vec<FuncId>) {
        let mut fx = Fixture::new();
        let mut handlers = Vec::new();
        let mut expected = Vec::new();
        let (source, sink) = (fx.source, fx.sink);
        for i in 0..12 {
            let h = fx.add_handler(&format!("H{i}"));
            handlers.push(h);
            // every third handler reaches both a source and a sink
            if i % 3 == 0 {
                fx.b.set_instrs(h, vec![Instr::call(source), Instr::call(sink)]);
                expected.push(h);
            } else if i % 3 == 1 {
                fx.b.set_instrs(h, vec![Instr::call(source)]);
            } else {
                fx.b.set_instrs(h, vec![Instr::call(sink)]);
            }
        }
        fx.register(&handlers);
        (fx.build(), expected)
    }

    let mut sets = Vec::new();
    for workers in [1, 2, 8] {
        let (program, expected) = build();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .unwrap();
        let report = pool.install(|| analyze(&program));
        let mut risky = report.risky_handlers.clone();
        risky.sort();
        assert_eq!(risky, expected, "workers={workers}");
        sets.push(risky);
    }
    assert!(sets.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn call_to_missing_body_is_harmless() {
    let mut fx = Fixture::new();
    let h = fx.add_handler("Thin");
    let ext = fx.b.add_external_function(
        "example.com/cmd",
        "cgoThunk",
        Signature::default(),
    );
    fx.register(&[h]);
    fx.b.set_instrs(h, vec![Instr::call(ext)]);
    let program = fx.build();

    let report = analyze(&program);
    assert_eq!(report.active_handlers, vec![h]);
    assert!(report.risky_handlers.is_empty());
}
