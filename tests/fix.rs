mod common;

use common::{fix, fix_with, module, read};
use errfix::{Level, Mode};
use pretty_assertions::assert_eq;

#[test]
fn missing_error_binding_is_added_and_checked() {
    let source = concat!(
        "package app\n",
        "\n",
        "func compute() (int, error) {\n",
        "\treturn 42, nil\n",
        "}\n",
        "\n",
        "func run() (int, error) {\n",
        "\tresult := compute()\n",
        "\t_ = result\n",
        "\treturn 0, nil\n",
        "}\n",
    );
    let dir = module(&[("app.go", source)]);
    let summary = fix(dir.path());

    assert_eq!(
        read(dir.path(), "app.go"),
        concat!(
            "package app\n",
            "\n",
            "func compute() (int, error) {\n",
            "\treturn 42, nil\n",
            "}\n",
            "\n",
            "func run() (int, error) {\n",
            "\tresult, err := compute()\n",
            "\tif err != nil {\n",
            "\t\treturn 0, err\n",
            "\t}\n",
            "\t_ = result\n",
            "\treturn 0, nil\n",
            "}\n",
        )
    );
    assert_eq!(summary.handled, 1);
    assert!(summary.functions_changed.is_empty());
    assert!(summary.converged);
}

const DO_WORK: &str = concat!(
    "package main\n",
    "\n",
    "import \"os\"\n",
    "\n",
    "func doWork() {\n",
    "\tos.Remove(\"tmp\")\n",
    "}\n",
    "\n",
    "func main() {\n",
    "\tdoWork()\n",
    "}\n",
);

#[test]
fn helper_gains_an_error_and_main_terminates() {
    let dir = module(&[("main.go", DO_WORK)]);
    let summary = fix(dir.path());

    assert_eq!(
        read(dir.path(), "main.go"),
        concat!(
            "package main\n",
            "\n",
            "import (\n",
            "\t\"log\"\n",
            "\t\"os\"\n",
            ")\n",
            "\n",
            "func doWork() error {\n",
            "\tif err := os.Remove(\"tmp\"); err != nil {\n",
            "\t\treturn err\n",
            "\t}\n",
            "\treturn nil\n",
            "}\n",
            "\n",
            "func main() {\n",
            "\tif err := doWork(); err != nil {\n",
            "\t\tlog.Fatal(err)\n",
            "\t}\n",
            "}\n",
        )
    );
    assert_eq!(summary.functions_changed, vec!["doWork".to_string()]);
    assert_eq!(summary.modified, vec![dir.path().join("main.go")]);
}

#[test]
fn a_second_run_changes_nothing() {
    let dir = module(&[("main.go", DO_WORK)]);
    fix(dir.path());
    let first = read(dir.path(), "main.go");

    let summary = fix(dir.path());
    assert_eq!(read(dir.path(), "main.go"), first);
    assert!(summary.modified.is_empty());
    assert_eq!(summary.handled, 0);
    assert_eq!(summary.iterations, 1);
    assert!(summary.converged);
}

#[test]
fn ignore_directives_leave_calls_alone() {
    let source = concat!(
        "package app\n",
        "\n",
        "import \"os\"\n",
        "\n",
        "func tidy() error {\n",
        "\t// errfix:ignore -- best effort\n",
        "\tos.Remove(\"a\")\n",
        "\tos.Remove(\"b\") // errfix:ignore\n",
        "\treturn nil\n",
        "}\n",
    );
    let dir = module(&[("app.go", source)]);
    let summary = fix(dir.path());
    assert_eq!(read(dir.path(), "app.go"), source);
    assert!(summary.modified.is_empty());
}

#[test]
fn excluded_files_and_symbols_are_left_alone() {
    let generated = concat!(
        "package app\n",
        "\n",
        "import \"os\"\n",
        "\n",
        "func generated() error {\n",
        "\tos.Remove(\"gen\")\n",
        "\treturn nil\n",
        "}\n",
    );
    let handwritten = concat!(
        "package app\n",
        "\n",
        "import \"os\"\n",
        "\n",
        "func handwritten() error {\n",
        "\tos.Chdir(\"/\")\n",
        "\tos.Remove(\"mine\")\n",
        "\treturn nil\n",
        "}\n",
    );
    let dir = module(&[("model_gen.go", generated), ("app.go", handwritten)]);
    fix_with(dir.path(), |config| {
        config.exclude_files.push("*_gen.go".into());
        config.exclude_symbols.push("os.Chdir".into());
    });

    assert_eq!(read(dir.path(), "model_gen.go"), generated);
    let text = read(dir.path(), "app.go");
    assert!(text.contains("\tos.Chdir(\"/\")\n"), "{text}");
    assert!(
        text.contains("\tif err := os.Remove(\"mine\"); err != nil {\n\t\treturn err\n\t}\n"),
        "{text}"
    );
}

#[test]
fn methods_satisfying_an_interface_log_instead() {
    let source = concat!(
        "package app\n",
        "\n",
        "import \"os\"\n",
        "\n",
        "type Runner interface {\n",
        "\tRun()\n",
        "}\n",
        "\n",
        "type task struct{}\n",
        "\n",
        "func (task) Run() {\n",
        "\tos.Remove(\"x\")\n",
        "}\n",
        "\n",
        "var _ Runner = task{}\n",
    );
    let dir = module(&[("app.go", source)]);
    let summary = fix(dir.path());

    let text = read(dir.path(), "app.go");
    assert!(text.contains("func (task) Run() {\n"), "{text}");
    assert!(
        text.contains("\tif err := os.Remove(\"x\"); err != nil {\n\t\tlog.Printf(\"os.Remove: %v\", err)\n\t}\n"),
        "{text}"
    );
    assert!(text.contains("\"log\""), "{text}");
    assert!(summary.functions_changed.is_empty());
}

#[test]
fn comments_and_untouched_code_survive() {
    let source = concat!(
        "package app\n",
        "\n",
        "import \"os\"\n",
        "\n",
        "// keep is not touched.\n",
        "func keep() int {\n",
        "\treturn 1 // one\n",
        "}\n",
        "\n",
        "// tidy removes scratch files.\n",
        "func tidy() error {\n",
        "\t// the scratch file may be missing\n",
        "\tos.Remove(\"scratch\")\n",
        "\treturn nil\n",
        "}\n",
    );
    let dir = module(&[("app.go", source)]);
    fix(dir.path());

    let text = read(dir.path(), "app.go");
    assert!(text.contains("// keep is not touched.\nfunc keep() int {\n\treturn 1 // one\n}\n"), "{text}");
    assert!(text.contains("// tidy removes scratch files.\nfunc tidy() error {\n"), "{text}");
    assert!(
        text.contains("\t// the scratch file may be missing\n\tif err := os.Remove(\"scratch\"); err != nil {\n"),
        "{text}"
    );
}

#[test]
fn errors_travel_across_packages() {
    let store = concat!(
        "package store\n",
        "\n",
        "import \"os\"\n",
        "\n",
        "func Save() {\n",
        "\tos.Remove(\"x\")\n",
        "}\n",
    );
    let main = concat!(
        "package main\n",
        "\n",
        "import \"example.com/app/store\"\n",
        "\n",
        "func main() {\n",
        "\tstore.Save()\n",
        "}\n",
    );
    let dir = module(&[("store/store.go", store), ("main.go", main)]);
    let summary = fix(dir.path());

    assert!(read(dir.path(), "store/store.go").contains("func Save() error {\n"));
    let text = read(dir.path(), "main.go");
    assert!(text.contains("\tif err := store.Save(); err != nil {\n\t\tlog.Fatal(err)\n\t}\n"), "{text}");
    assert_eq!(summary.modified.len(), 2);
}

#[test]
fn safe_level_never_changes_signatures() {
    let dir = module(&[("main.go", DO_WORK)]);
    let summary = fix_with(dir.path(), |config| config.level = Level::Safe);

    let text = read(dir.path(), "main.go");
    assert!(text.contains("func doWork() {\n"), "{text}");
    assert!(text.contains("log.Printf(\"os.Remove: %v\", err)"), "{text}");
    assert!(text.contains("func main() {\n\tdoWork()\n}\n"), "{text}");
    assert!(summary.functions_changed.is_empty());
}

#[test]
fn directives_in_switch_and_select_clauses_are_honored() {
    let source = concat!(
        "package app\n",
        "\n",
        "import \"os\"\n",
        "\n",
        "func tidy(mode int, ch chan int) error {\n",
        "\tswitch mode {\n",
        "\tcase 1:\n",
        "\t\tos.Remove(\"a\") //errfix:ignore\n",
        "\tdefault:\n",
        "\t\t// errfix:ignore -- scratch\n",
        "\t\tos.Remove(\"b\")\n",
        "\t}\n",
        "\tselect {\n",
        "\tcase <-ch:\n",
        "\t\tos.Remove(\"c\") //errfix:ignore\n",
        "\tdefault:\n",
        "\t}\n",
        "\treturn nil\n",
        "}\n",
    );
    let dir = module(&[("app.go", source)]);
    let summary = fix(dir.path());
    assert_eq!(read(dir.path(), "app.go"), source);
    assert!(summary.modified.is_empty());
    assert_eq!(summary.handled, 0);
}

#[test]
fn initializer_discards_are_checked_before_the_statement() {
    let source = concat!(
        "package app\n",
        "\n",
        "import (\n",
        "\t\"os\"\n",
        "\t\"strconv\"\n",
        ")\n",
        "\n",
        "func run(s string) error {\n",
        "\tif v, _ := strconv.Atoi(s); v > 0 {\n",
        "\t\tprintln(v)\n",
        "\t}\n",
        "\tswitch os.Remove(s); s {\n",
        "\tcase \"x\":\n",
        "\t\tprintln(s)\n",
        "\t}\n",
        "\treturn nil\n",
        "}\n",
    );
    let dir = module(&[("app.go", source)]);
    let summary = fix(dir.path());

    let text = read(dir.path(), "app.go");
    assert!(
        text.contains("\tif v, err := strconv.Atoi(s); err != nil {\n\t\treturn err\n\t} else if v > 0 {\n\t\tprintln(v)\n\t}\n"),
        "{text}"
    );
    assert!(text.contains("if err2 := os.Remove(s); err2 != nil {\n\t\treturn err2\n\t} else {\n\t\tswitch s {\n"), "{text}");
    assert_eq!(summary.handled, 2);
    assert_eq!(summary.skipped, 0);
}

#[test]
fn mixed_rewrites_leave_nothing_to_find() {
    let source = concat!(
        "package app\n",
        "\n",
        "import (\n",
        "\t\"os\"\n",
        "\t\"strconv\"\n",
        ")\n",
        "\n",
        "type config struct {\n",
        "\tName string\n",
        "}\n",
        "\n",
        "func load(path string) *config {\n",
        "\tdata, _ := os.ReadFile(path)\n",
        "\treturn &config{Name: string(data)}\n",
        "}\n",
        "\n",
        "func count(s string) int {\n",
        "\tn, _ := strconv.Atoi(s)\n",
        "\treturn n\n",
        "}\n",
        "\n",
        "func run(s string, mode int) error {\n",
        "\tif v, _ := strconv.Atoi(s); v > 0 {\n",
        "\t\tprintln(v)\n",
        "\t}\n",
        "\tswitch os.Remove(s); mode {\n",
        "\tcase 1:\n",
        "\t\tos.Remove(\"a\")\n",
        "\tdefault:\n",
        "\t\tprintln(load(s).Name)\n",
        "\t}\n",
        "\tif count(s) > 2 {\n",
        "\t\tprintln(\"big\")\n",
        "\t}\n",
        "\treturn nil\n",
        "}\n",
    );
    let dir = module(&[("app.go", source)]);
    let summary = fix(dir.path());
    assert!(summary.converged);
    assert_eq!(summary.skipped, 0);
    let first = read(dir.path(), "app.go");

    let check = fix_with(dir.path(), |config| config.mode = Mode::Check);
    assert!(check.findings.is_empty(), "{:?}\n{first}", check.findings);

    let again = fix(dir.path());
    assert!(again.modified.is_empty());
    assert_eq!(read(dir.path(), "app.go"), first);
}

#[test]
fn local_function_values_can_be_excluded_by_symbol() {
    let source = concat!(
        "package app\n",
        "\n",
        "import \"os\"\n",
        "\n",
        "func tidy() error {\n",
        "\tcleanup := func() error {\n",
        "\t\treturn os.Remove(\"scratch\")\n",
        "\t}\n",
        "\tcleanup()\n",
        "\treturn nil\n",
        "}\n",
    );
    let dir = module(&[("app.go", source)]);
    let summary = fix_with(dir.path(), |config| {
        config.exclude_symbols.push("example.com/app.cleanup".into());
    });
    assert_eq!(read(dir.path(), "app.go"), source);
    assert!(summary.modified.is_empty());
}
