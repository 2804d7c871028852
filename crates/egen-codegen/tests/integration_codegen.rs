use std::path::PathBuf;

use egen_codegen::emitters::PLUGIN_IDS;
use egen_codegen::{CodegenError, DirSink, GenConfig, Pipeline, PipelineState, StreamSink};
use egen_spec::{load_specs, SpecDocument};
use pretty_assertions::assert_eq;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(name)
}

fn tenncor() -> SpecDocument {
    load_specs(&[fixture("tenncor")]).unwrap()
}

#[test]
fn test_every_plugin_contributes_files() {
    let mut pipeline = Pipeline::from_ids(&PLUGIN_IDS);
    let files = pipeline.run(&tenncor(), &GenConfig::default()).unwrap();
    assert_eq!(pipeline.state(), PipelineState::Done);

    let names: Vec<&str> = files.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec![
            "opcode.hpp",
            "opcode.cpp",
            "dtype.hpp",
            "dtype.cpp",
            "api.hpp",
            "api.cpp",
            "pyapi.hpp",
            "pyapi_tenncor.cpp",
            "pyapi_layr.cpp",
            "pyapi_api.cpp",
        ]
    );
}

#[test]
fn test_opcode_tables() {
    let files = Pipeline::from_ids(&["OPCODE"])
        .run(&tenncor(), &GenConfig::default())
        .unwrap();

    let header = &files["opcode.hpp"];
    assert_eq!(
        header.user_includes,
        vec!["<string>", "\"internal/global/global.hpp\"", "\"tenncor/eteq/operators.hpp\""]
    );
    assert!(header
        .content
        .contains("    BAD_OP = 0,\n    ADD = 1,\n    MUL = 2,\n    SUB = 3,\n    NEG = 4,\n    _N_GENERATED_OPCODES,"));

    let source = &files["opcode.cpp"].content;
    assert!(source.contains("commutatives =\n{\n    ADD,\n    MUL\n};"));
    assert!(source.contains("idempotents =\n{\n    ADD,\n    MUL,\n    SUB\n};"));
    // MUL borrows ADD's chain rule
    assert!(source.contains(
        "template <>\nteq::TensptrT chain_rule<MUL> (const teq::iFunctor& op, size_t arg_idx)\n{\n    return op.get_child(0);\n}"
    ));
    // SUB has no override: it only reaches the generic template through the dispatcher
    assert!(!source.contains("template <>\nteq::TensptrT chain_rule<SUB> ("));
    assert!(source.contains("case SUB: return chain_rule<SUB>(op, arg_idx);"));
}

#[test]
fn test_dtype_default_and_defines() {
    let files = Pipeline::from_ids(&["DTYPE"])
        .run(&tenncor(), &GenConfig::default())
        .unwrap();
    let header = &files["dtype.hpp"].content;
    assert!(header.contains("#define EGEN_FULLTYPE"));
    assert!(header.contains("const _GENERATED_DTYPE default_dtype = FLOAT;"));
    assert!(header.contains("    DOUBLE = 1,\n    FLOAT = 2,\n    INT32 = 3,"));
}

#[test]
fn test_bindings_over_fixture() {
    let files = Pipeline::from_ids(&["API", "PYBINDER"])
        .run(&tenncor(), &GenConfig::default())
        .unwrap();

    assert_eq!(
        files["pyapi.hpp"].content,
        "// scalar type substituted for template parameters in bindings\nusing PybindT = float;\n"
    );

    let tenncor = &files["pyapi_tenncor.cpp"].content;
    assert!(tenncor.contains("m_tenncor.def(\"pow\", "));
    assert!(tenncor.contains("m_tenncor.def(\"pow0\", [](teq::TensptrT a, double scalar) { return tenncor::pow(a, scalar); }"));
    assert!(tenncor.contains("m_tenncor.def(\"identity\", [](const eteq::ETensor<PybindT>& x) { return tenncor::identity<PybindT>(x); }"));
    assert!(tenncor.contains("py::class_<teq::Shape> m_Shape(m_tenncor, \"Shape\");"));
    assert!(!tenncor.contains("m_ETensor"));
    assert!(!tenncor.contains("debug_dump"));
    assert!(tenncor.contains("m_tenncor_random.def(\"rand_unif\", [](double lo, double hi) { return tenncor::random::rand_unif(lo, hi); }, py::arg(\"lo\"), py::arg(\"hi\")=1, \"rand_unif ...\");"));

    let layr = &files["pyapi_layr.cpp"].content;
    assert!(layr.contains("py::class_<layr::Dense> cls_Dense(m_layr, \"Dense\");\ncls_Dense.def(py::init<teq::TensptrT>(), py::arg(\"weight\"));"));
    assert!(layr.find("cls_Dense(").unwrap() < layr.find("cls_Sequence(").unwrap());

    let operators = &files["pyapi_api.cpp"].content;
    assert!(operators.contains("m_TensptrT.def(\"__add__\""));
    assert!(operators.contains("m_TensptrT.def(\"__rmul__\", [](teq::TensptrT b, double a) { return a * b; }"));
}

#[test]
fn test_every_bound_module_is_declared() {
    let files = Pipeline::from_ids(&["API", "PYBINDER"])
        .run(&tenncor(), &GenConfig::default())
        .unwrap();
    let def = regex::Regex::new(r"(?m)^(\w+)\.def\(").unwrap();

    let mut checked = 0;
    for (name, file) in files.iter().filter(|(name, _)| name.starts_with("pyapi_")) {
        let content = &file.content;
        for caps in def.captures_iter(content) {
            let var = &caps[1];
            let declared = content.contains(&format!("> {var}("))
                || content.contains(&format!("py::module {var} ="))
                || content.contains(&format!(", {var})\n{{"));
            assert!(declared, "{name}: '{var}' is never declared");
            checked += 1;
        }
    }
    assert!(checked > 0);
}

#[test]
fn test_dir_sink_resolves_internal_includes() {
    let spec = tenncor();
    let files = Pipeline::from_ids(&PLUGIN_IDS)
        .run(&spec, &GenConfig::default())
        .unwrap();

    let root = tempfile::tempdir().unwrap();
    let out_dir = root.path().join("tenncor").join("generated");
    let mut sink = DirSink::new(&out_dir, root.path().to_str().unwrap());
    let written = Pipeline::emit(&files, &mut sink).unwrap();
    assert_eq!(written, files.len());

    let api_cpp = std::fs::read_to_string(out_dir.join("api.cpp")).unwrap();
    assert!(api_cpp.starts_with("#include \"tenncor/generated/api.hpp\"\n\n#ifdef _GENERATED_API_HPP"));

    let module = std::fs::read_to_string(out_dir.join("pyapi_layr.cpp")).unwrap();
    assert!(module.contains(
        "#include \"tenncor/tenncor.hpp\"\n#include \"tenncor/generated/pyapi.hpp\"\n#include \"tenncor/generated/api.hpp\"\n\nnamespace py = pybind11;"
    ));
}

#[test]
fn test_stream_sink_banners() {
    let files = Pipeline::from_ids(&["DTYPE"])
        .run(&tenncor(), &GenConfig::default())
        .unwrap();
    let mut sink = StreamSink::new(Vec::new(), "gen");
    Pipeline::emit(&files, &mut sink).unwrap();
    let out = String::from_utf8(sink.into_inner()).unwrap();

    let banners: Vec<&str> = out.lines().filter(|l| l.starts_with("==============")).collect();
    assert_eq!(
        banners,
        vec!["============== dtype.hpp ==============", "============== dtype.cpp =============="]
    );
    assert!(out.contains("============== dtype.cpp ==============\n#include \"estd/contain.hpp\"\n#include \"gen/dtype.hpp\"\n"));
}

#[test]
fn test_config_renames_generated_symbols() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("egen.json");
    std::fs::write(
        &path,
        r#"{ "namespace": "tnc", "fatalFn": "logs::fatal", "bindingAlias": "ScalarT" }"#,
    )
    .unwrap();
    let config = GenConfig::load(&path).unwrap();

    let files = Pipeline::from_ids(&["OPCODE", "PYBINDER"])
        .run(&tenncor(), &config)
        .unwrap();
    let header = &files["opcode.hpp"].content;
    assert!(header.contains("namespace tnc\n{"));
    assert!(header.contains("default: logs::fatal(\"unknown opcode\");"));
    assert!(files["pyapi.hpp"].content.contains("using ScalarT = float;"));
}

#[test]
fn test_cyclic_classes_abort_the_run() {
    let spec = load_specs(&[fixture("cyclic")]).unwrap();
    let mut pipeline = Pipeline::from_ids(&PLUGIN_IDS);
    let err = pipeline.run(&spec, &GenConfig::default()).unwrap_err();
    assert!(matches!(err, CodegenError::CircularDependency { .. }));
    // OPCODE and DTYPE have nothing to do; API fails
    assert_eq!(pipeline.state(), PipelineState::Running(2));
}

#[test]
fn test_yaml_and_json_specs_agree() {
    let yaml: serde_json::Value =
        serde_yaml::from_str("dtype:\n  DOUBLE:\n    ctype: double\n").unwrap();
    let from_yaml: SpecDocument = serde_json::from_value(yaml).unwrap();
    let from_json: SpecDocument =
        serde_json::from_str(r#"{ "dtype": { "DOUBLE": { "ctype": "double" } } }"#).unwrap();
    assert_eq!(from_yaml, from_json);
}
