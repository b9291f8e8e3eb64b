//! Property tests: pack→unpack reproduces any acyclic tree, and sorting
//! restores dense sibling numbering everywhere.

use proptest::prelude::*;
use sniplets::document::{Children, DocumentContainer};
use sniplets::space::{sequence, Space, SortKey, SortOptions};
use sniplets::tree::{Color, Folder, Sniplet, TreeItem};

fn arb_color() -> impl Strategy<Value = Option<Color>> {
    proptest::option::of(prop_oneof![
        Just(Color::Red),
        Just(Color::Orange),
        Just(Color::Yellow),
        Just(Color::Green),
        Just(Color::Blue),
        Just(Color::Purple),
        Just(Color::Gray),
    ])
}

fn arb_sniplet() -> impl Strategy<Value = TreeItem> {
    (
        "[a-zA-Z][a-zA-Z0-9 ]{0,15}",
        1u32..50,
        arb_color(),
        "[ -~]{0,40}",
        any::<bool>(),
        proptest::option::of(proptest::char::range('a', 'z')),
        proptest::option::of("[a-z]{1,12}"),
    )
        .prop_map(
            |(name, seq, color, content, nosubst, shortcut, source_url)| {
                TreeItem::Sniplet(Sniplet {
                    name,
                    seq,
                    color,
                    content,
                    nosubst,
                    shortcut,
                    source_url,
                })
            },
        )
}

fn arb_tree() -> impl Strategy<Value = Vec<TreeItem>> {
    let item = arb_sniplet().prop_recursive(3, 16, 4, |inner| {
        (
            "[a-zA-Z][a-zA-Z0-9 ]{0,15}",
            1u32..50,
            arb_color(),
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(name, seq, color, children)| {
                TreeItem::Folder(Folder {
                    name,
                    seq,
                    color,
                    children,
                })
            })
    });
    prop::collection::vec(item, 0..5)
}

fn assert_dense(items: &[TreeItem]) {
    for (index, item) in items.iter().enumerate() {
        assert_eq!(item.seq() as usize, index + 1);
        if let TreeItem::Folder(folder) = item {
            assert_dense(&folder.children);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn pack_unpack_reproduces_tree(items in arb_tree()) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let mut doc = DocumentContainer {
                children: Children::Live(items.clone()),
                ..DocumentContainer::new()
            };
            doc.pack().await.unwrap();
            assert!(doc.children.is_packed());
            doc.unpack().await.unwrap();
            assert_eq!(doc.children.live().unwrap(), &items);
        });
    }

    #[test]
    fn recursive_sort_restores_density(items in arb_tree()) {
        let mut space = Space::new("prop", false);
        space.data.children = Children::Live(items);
        space.sort(&SortOptions {
            key: SortKey::Name,
            folders_first: true,
            recursive: true,
            ..SortOptions::default()
        });
        assert_dense(space.data.folder_children(&[]).unwrap());
    }

    #[test]
    fn sequence_is_idempotent(items in arb_tree()) {
        let mut first = items;
        sequence(&mut first);
        let mut second = first.clone();
        sequence(&mut second);
        prop_assert_eq!(&first, &second);
        for (index, item) in first.iter().enumerate() {
            prop_assert_eq!(item.seq() as usize, index + 1);
        }
    }
}
