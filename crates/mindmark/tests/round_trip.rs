use mindmark::{
    convert_to_markdown, convert_to_native, ConvertOptions, HostEnvironment, IdPolicy,
    IndentOptions, IndentUnit, MarkdownToQqConverter, MindmarkError, MindmarkService, NativeTree,
    Node, QqToMarkdownConverter, RichTextFormatter, Run, Style,
};
use mindmark::{IndentManager, LinePreserver};
use proptest::prelude::*;

fn without_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Depth and whitespace-free text of every node in pre-order
fn outline(root: &Node) -> Vec<(usize, String)> {
    root.walk()
        .map(|(depth, node)| (depth, without_whitespace(&node.plain_text())))
        .collect()
}

fn round_trip(root: &Node, options: &ConvertOptions) -> Node {
    let indent = IndentManager::new(options.indent.clone());
    let markdown = QqToMarkdownConverter::new(RichTextFormatter::new(), indent.clone(), options.clone())
        .convert(root)
        .unwrap();
    MarkdownToQqConverter::new(
        RichTextFormatter::new(),
        indent,
        LinePreserver::new(),
        options.clone(),
    )
    .parse(&markdown)
    .unwrap()
}

fn options(heading_levels: usize, unit: IndentUnit) -> ConvertOptions {
    ConvertOptions {
        heading_levels,
        indent: IndentOptions {
            unit,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn test_document_round_trip() {
    let root = Node::text("r", "Project")
        .child(
            Node::with_runs(
                "a",
                vec![Run::bold("数据格式："), Run::new("距离,归一化值", Style::BOLD.with_code())],
            )
            .child(Node::text("a1", "first"))
            .child(Node::text("a2", "second").child(Node::with_runs(
                "a21",
                vec![Run::plain("use "), Run::code("cargo"), Run::plain(" and "), Run::italic("rest")],
            ))),
        )
        .child(Node::text("b", "Later"));

    for levels in 0..4 {
        for unit in [IndentUnit::Spaces(2), IndentUnit::Spaces(4), IndentUnit::Tab] {
            let back = round_trip(&root, &options(levels, unit));
            assert_eq!(outline(&back), outline(&root), "levels {levels}, unit {unit:?}");
        }
    }
}

#[test]
fn test_fenced_node_round_trip() {
    let root = Node::text("r", "Root").child(
        Node::text("a", "Setup")
            .child(Node::code_block("c", "sh", "cargo build\n\n  --release"))
            .child(Node::text("d", "done")),
    );

    let back = round_trip(&root, &options(1, IndentUnit::Spaces(4)));
    let code = &back.children[0].children[0];
    assert_eq!(code.fence.as_deref(), Some("sh"));
    assert_eq!(code.plain_text(), "cargo build\n\n  --release");
    assert_eq!(back.children[0].children[1].plain_text(), "done");
}

#[test]
fn test_code_block_beside_heading_round_trip() {
    let root = Node::text("r", "Root")
        .child(Node::text("a", "A"))
        .child(Node::code_block("c", "sh", "ls"));

    let back = round_trip(&root, &options(2, IndentUnit::Spaces(4)));
    assert_eq!(
        outline(&back),
        vec![(0, "Root".to_string()), (1, "A".to_string()), (1, "ls".to_string())]
    );
    assert_eq!(back.children[1].fence.as_deref(), Some("sh"));
}

#[test]
fn test_code_block_root_with_heading_children_round_trip() {
    let root = Node::code_block("r", "sh", "ls")
        .child(Node::text("a", "A").child(Node::text("b", "B")))
        .child(Node::code_block("c", "", "pwd"));

    for levels in 1..4 {
        let back = round_trip(&root, &options(levels, IndentUnit::Spaces(2)));
        assert_eq!(outline(&back), outline(&root), "levels {levels}");
        assert!(back.is_fenced());
        assert!(back.children[1].is_fenced());
    }
}

#[test]
fn test_json_round_trip_with_embedded_ids() {
    let json = r#"{
        "root": "plan",
        "nodes": {
            "plan": { "title": "Plan", "children": ["s-1", "s-2"] },
            "s-1": { "title": [{ "text": "Build", "bold": true }], "children": ["k"] },
            "k": { "title": "make all", "children": [], "fence": "sh" },
            "s-2": { "title": "Ship", "children": [] }
        }
    }"#;
    let options = ConvertOptions {
        id_policy: IdPolicy::Embed,
        heading_levels: 1,
        ..Default::default()
    };
    let tree: NativeTree = serde_json::from_str(json).unwrap();

    let markdown = convert_to_markdown(&tree, &options).unwrap();
    assert_eq!(
        markdown,
        "# Plan ^plan\n- **Build** ^s-1\n    ```sh ^k\n    make all\n    ```\n- Ship ^s-2\n"
    );

    let back = convert_to_native(&markdown, &options).unwrap();
    assert_eq!(back, tree);
}

#[test]
fn test_depth_bound() {
    let mut root = Node::text("d0", "d0");
    for depth in (1..10).rev() {
        root = Node::text(format!("d{depth}"), &format!("d{depth}")).child(root);
    }
    let root = Node::text("top", "top").child(root);

    let options = ConvertOptions {
        heading_levels: 9,
        host: HostEnvironment::Embedded,
        ..Default::default()
    };
    let markdown = QqToMarkdownConverter::new(
        RichTextFormatter::new(),
        IndentManager::default(),
        options.clone(),
    )
    .convert(&root)
    .unwrap();

    for line in markdown.lines().filter(|l| l.starts_with('#')) {
        let level = line.chars().take_while(|&c| c == '#').count();
        assert!(level <= 6, "{line}");
    }
    assert!(markdown.contains("\n- d"));

    let back = round_trip(&root, &options);
    assert_eq!(outline(&back), outline(&root));
}

#[test]
fn test_orphaned_indent_jump_is_rejected() {
    let service = MindmarkService::new();
    let err = service
        .convert_to_native("# Root\n- a\n        - too deep\n")
        .unwrap_err();
    match err {
        MindmarkError::Structure { line, .. } => assert_eq!(line, 3),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_repair_fixtures_through_service() {
    let service = MindmarkService::new();
    let cases = [
        (
            "**数据格式：****`距离,归一化值`**",
            "**数据格式：** **`距离,归一化值`**",
        ),
        (
            "**测试****`code1`****`code2`**",
            "**测试** **`code1`** **`code2`**",
        ),
        ("**正常粗体文本**", "**正常粗体文本**"),
        ("普通文本`代码`普通文本", "普通文本`代码`普通文本"),
        (
            "**配置项：****`api_key`** 和 ****`secret`**",
            "**配置项：** **`api_key`** 和 **`secret`**",
        ),
    ];
    for (input, expected) in cases {
        assert_eq!(service.normalize_markdown(input).unwrap(), expected);
    }
}

fn run() -> impl Strategy<Value = Run> {
    (
        "[a-z中]([a-z中 ]{0,6}[a-z中])?",
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(text, bold, italic, code)| Run::new(text, Style { bold, italic, code }))
}

/// A text node or a code block node
fn leaf() -> impl Strategy<Value = Node> {
    prop_oneof![
        3 => prop::collection::vec(run(), 0..3).prop_map(|runs| Node::with_runs("", runs)),
        1 => ("[a-z]{0,3}", "[a-z]([a-z ]{0,6}[a-z])?(\n[a-z]{1,4}){0,2}")
            .prop_map(|(info, code)| Node::code_block("", info, &code)),
    ]
}

fn tree() -> impl Strategy<Value = Node> {
    leaf().prop_recursive(5, 40, 4, |inner| {
        (
            prop::collection::vec(run(), 0..3),
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(runs, children)| {
                let mut node = Node::with_runs("", runs);
                node.children = children;
                node
            })
    })
}

fn unit() -> impl Strategy<Value = IndentUnit> {
    prop_oneof![
        Just(IndentUnit::Spaces(2)),
        Just(IndentUnit::Spaces(4)),
        Just(IndentUnit::Tab),
    ]
}

proptest! {
    #[test]
    fn tree_survives_markdown_round_trip(root in tree(), levels in 0usize..4, unit in unit()) {
        let options = options(levels, unit);
        let back = round_trip(&root, &options);
        prop_assert_eq!(back.count(), root.count());
        prop_assert_eq!(outline(&back), outline(&root));
    }

    #[test]
    fn markdown_is_a_fixed_point_of_normalize(root in tree(), levels in 0usize..4) {
        let service = MindmarkService::with_options(options(levels, IndentUnit::Spaces(4)));
        let markdown = service.convert_to_markdown(&NativeTree::from_node(&with_ids(root))).unwrap();
        prop_assert_eq!(service.normalize_markdown(&markdown).unwrap(), markdown);
    }
}

fn with_ids(mut root: Node) -> Node {
    let mut next = 0;
    root.for_each_mut(&mut |node: &mut Node| {
        next += 1;
        node.id = format!("n{next}");
    });
    root
}
