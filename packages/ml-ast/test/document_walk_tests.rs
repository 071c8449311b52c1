/**
 * Document and walker tests
 *
 * Builds documents through a hand-assembled dialect and checks the node
 * list invariants and both traversal orders.
 */

#[path = "util/mod.rs"]
mod utils;

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use async_trait::async_trait;
    use ml_ast::{parse, Document, Node, NodeData, NodeKind, ParseOptions, ParserErrorKind, Walker};
    use serde_json::json;

    use super::utils::{element, nested_tree, text, Toy, ToyAdapter, NESTED};

    fn parse_toy(raw: &str, roots: Vec<Toy>) -> Document {
        parse(&ToyAdapter::new(roots), raw, &ParseOptions::default()).unwrap()
    }

    fn names(doc: &Document) -> Vec<String> {
        let mut names = Vec::new();
        doc.sync_walk(|node: &Node| {
            names.push(format!("{:?}:{}", node.kind(), node.node_name()));
            Ok(())
        })
        .unwrap();
        names
    }

    mod building {
        use super::*;

        #[test]
        fn should_list_nodes_in_pre_order_with_end_tags_after_descendants() {
            let doc = parse_toy(NESTED, nested_tree());
            assert_eq!(
                names(&doc),
                vec!["Element:div", "Text:#text", "Element:p", "Text:#text", "EndTag:p", "EndTag:div"]
            );
        }

        #[test]
        fn should_round_trip_source() {
            let doc = parse_toy(NESTED, nested_tree());
            assert_eq!(doc.to_string(), NESTED);
            assert_eq!(doc.raw(), NESTED);
        }

        #[test]
        fn should_link_parents_children_and_pairs() {
            let doc = parse_toy(NESTED, nested_tree());
            let div = doc.get_node(0).unwrap();
            let p = doc.get_node(2).unwrap();
            assert_eq!(div.depth, 0);
            assert_eq!(p.depth, 1);
            assert_eq!(doc.parent_of(p).map(Node::raw), Some("<div>"));
            let child_raws: Vec<&str> = doc.children_of(div).map(Node::raw).collect();
            assert_eq!(child_raws, vec!["a", "<p>"]);

            let end_p = doc.get_node(4).unwrap();
            assert_eq!(end_p.as_end_tag().and_then(|end| end.pair), Some(p.id));
            assert_eq!(p.as_element().and_then(|el| el.end_tag), Some(end_p.id));
            assert_eq!(end_p.depth, p.depth);
            assert_eq!(end_p.parent, p.parent);
        }

        #[test]
        fn should_keep_offsets_non_decreasing() {
            let doc = parse_toy(NESTED, nested_tree());
            let offsets: Vec<usize> = doc.list().iter().map(|node| node.token.start_offset).collect();
            assert!(offsets.windows(2).all(|pair| pair[0] <= pair[1]));
            assert_eq!(doc.roots().count(), 1);
        }

        #[test]
        fn should_add_ghost_for_implied_close() {
            let doc = parse_toy("<li>x", vec![element((0, 4), None, vec![text(4, 5)])]);
            let ghost = doc.get_node(2).unwrap();
            assert!(ghost.is_ghost());
            assert_eq!(ghost.node_name(), "li");
            assert_eq!(ghost.token.start_offset, 5);
            assert!(ghost.token.is_empty());
            assert!(doc.get_node(0).unwrap().as_element().unwrap().is_implied_close);
            assert_eq!(doc.to_string(), "<li>x");
        }

        #[test]
        fn should_not_add_ghost_for_void_or_self_closing_elements() {
            let doc = parse_toy("<br><x/>", vec![element((0, 4), None, vec![]), element((4, 8), None, vec![])]);
            assert_eq!(doc.list().len(), 2);
            assert!(doc.get_node(1).unwrap().as_element().unwrap().self_closing);
        }

        #[test]
        fn should_reparent_nodes_returned_at_wrong_level() {
            let raw = "<div>ab</div>";
            let roots = vec![element((0, 5), Some((7, 13)), vec![text(5, 6), Toy::Misplaced(6, 7)])];
            let doc = parse_toy(raw, roots);
            let div = doc.get_node(0).unwrap();
            let misplaced = doc.get_node(2).unwrap();
            assert_eq!(div.children().len(), 1);
            assert_eq!(misplaced.parent, None);
            assert_eq!(misplaced.depth, 0);
            assert_eq!(doc.roots().count(), 2);
            assert_eq!(doc.to_string(), raw);
        }

        #[test]
        fn should_parse_attributes_from_start_tag() {
            let raw = "<div a=\"1\" b c='2'></div>";
            let doc = parse_toy(raw, vec![element((0, 19), Some((19, 25)), vec![])]);
            let div = doc.get_node(0).unwrap().as_element().unwrap();
            let attrs: Vec<(&str, &str)> = div
                .attributes
                .iter()
                .filter_map(|attr| attr.as_html())
                .map(|attr| (attr.name.raw.as_str(), attr.value.raw.as_str()))
                .collect();
            assert_eq!(attrs, vec![("a", "1"), ("b", ""), ("c", "2")]);
            let c = div.attr("c").and_then(|attr| attr.as_html()).unwrap();
            assert_eq!(c.token.raw, "c='2'");
            assert_eq!((c.token.start_offset, c.token.end_offset), (13, 18));
            assert_eq!(c.start_quote.as_ref().map(|t| t.raw.as_str()), Some("'"));
        }

        #[test]
        fn should_shift_positions_by_embedding_offsets() {
            let options = ParseOptions {
                offset_offset: 100,
                offset_line: 5,
                offset_column: 3,
                ..ParseOptions::default()
            };
            let doc = parse(&ToyAdapter::new(nested_tree()), NESTED, &options).unwrap();
            let div = doc.get_node(0).unwrap();
            assert_eq!(div.token.start_offset, 100);
            assert_eq!((div.token.start_line, div.token.start_col), (5, 3));
            let p = doc.get_node(2).unwrap();
            assert_eq!(p.token.start_offset, 106);
        }

        #[test]
        fn should_wrap_native_errors() {
            let err = parse(&ToyAdapter::new(vec![Toy::Broken(2, 4)]), "abcdef", &ParseOptions::default()).unwrap_err();
            assert_eq!(err.kind, ParserErrorKind::Syntax);
            assert_eq!(err.message, "Broken input");
            assert_eq!(err.raw(), "cd");
        }

        #[test]
        fn should_reject_out_of_range_tokens() {
            let err = parse(&ToyAdapter::new(vec![text(0, 10)]), "abc", &ParseOptions::default()).unwrap_err();
            assert_eq!(err.kind, ParserErrorKind::Fragment);
        }
    }

    mod walking {
        use super::*;

        struct Recorder {
            log: Rc<RefCell<Vec<String>>>,
            fail_at: Option<usize>,
            seen: usize,
        }

        #[async_trait(?Send)]
        impl Walker for Recorder {
            async fn visit(&mut self, node: &Node) -> anyhow::Result<()> {
                let index = self.seen;
                self.seen += 1;
                self.log.borrow_mut().push(format!("start {index}"));
                // later nodes finish faster; ordering must still hold
                tokio::time::sleep(Duration::from_millis(10u64.saturating_sub(index as u64 * 2))).await;
                self.log.borrow_mut().push(format!("end {index}"));
                if self.fail_at == Some(index) {
                    anyhow::bail!("cannot handle {}", node.node_name());
                }
                Ok(())
            }
        }

        fn recorder(fail_at: Option<usize>) -> (Recorder, Rc<RefCell<Vec<String>>>) {
            let log = Rc::new(RefCell::new(Vec::new()));
            (
                Recorder {
                    log: Rc::clone(&log),
                    fail_at,
                    seen: 0,
                },
                log,
            )
        }

        #[tokio::test]
        async fn should_await_each_visit_before_the_next() {
            let doc = parse_toy(NESTED, nested_tree());
            let (mut walker, log) = recorder(None);
            doc.walk(&mut walker).await.unwrap();
            let expected: Vec<String> = (0..6)
                .flat_map(|i| [format!("start {i}"), format!("end {i}")])
                .collect();
            assert_eq!(*log.borrow(), expected);
        }

        #[tokio::test]
        async fn should_stop_at_first_failure() {
            let doc = parse_toy(NESTED, nested_tree());
            let (mut walker, log) = recorder(Some(2));
            let err = doc.walk(&mut walker).await.unwrap_err();
            assert_eq!(err.index(), 2);
            assert!(err.to_string().contains("node #2"));
            assert_eq!(log.borrow().last().map(String::as_str), Some("end 2"));
            assert_eq!(log.borrow().len(), 6);
        }

        #[tokio::test]
        async fn should_walk_only_requested_kind() {
            let doc = parse_toy(NESTED, nested_tree());
            let (mut walker, log) = recorder(None);
            doc.walk_on(NodeKind::EndTag, &mut walker).await.unwrap();
            assert_eq!(log.borrow().len(), 4);
        }

        #[tokio::test]
        async fn should_walk_with_async_closure() {
            let doc = parse_toy(NESTED, nested_tree());
            let visited = RefCell::new(Vec::new());
            doc.walk_fn(Some(NodeKind::Element), |node| {
                let visited = &visited;
                async move {
                    tokio::task::yield_now().await;
                    visited.borrow_mut().push(node.raw().to_string());
                    Ok::<(), anyhow::Error>(())
                }
            })
            .await
            .unwrap();
            assert_eq!(visited.into_inner(), vec!["<div>", "<p>"]);
        }

        struct Counter(usize);

        #[async_trait(?Send)]
        impl Walker for Counter {
            async fn visit(&mut self, _node: &Node) -> anyhow::Result<()> {
                self.0 += 1;
                Ok(())
            }
        }

        #[test]
        fn should_walk_without_a_runtime() {
            let doc = parse_toy(NESTED, nested_tree());
            let mut counter = Counter(0);
            futures::executor::block_on(doc.walk_on(NodeKind::Text, &mut counter)).unwrap();
            assert_eq!(counter.0, 2);
        }

        #[test]
        fn should_sync_walk_on_kind_and_fail_fast() {
            let doc = parse_toy(NESTED, nested_tree());
            let mut texts = Vec::new();
            doc.sync_walk_on(NodeKind::Text, |node: &Node| {
                texts.push(node.raw().to_string());
                Ok(())
            })
            .unwrap();
            assert_eq!(texts, vec!["a", "b"]);

            let mut count = 0;
            let err = doc
                .sync_walk(|node: &Node| {
                    count += 1;
                    if matches!(node.data, NodeData::EndTag(_)) {
                        anyhow::bail!("end tag");
                    }
                    Ok(())
                })
                .unwrap_err();
            assert_eq!(err.index(), 4);
            assert_eq!(count, 5);
        }

        #[test]
        fn should_let_visitors_write_metadata() {
            let doc = parse_toy(NESTED, nested_tree());
            doc.sync_walk(|node: &Node| {
                node.set_meta("depth-seen", json!(node.depth));
                Ok(())
            })
            .unwrap();
            assert_eq!(doc.get_node(3).and_then(|node| node.meta("depth-seen")), Some(json!(2)));
            assert_eq!(doc.to_json()["nodeList"][3]["meta"]["depth-seen"], json!(2));
        }
    }
}
