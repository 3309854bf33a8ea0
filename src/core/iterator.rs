//! Property iteration
//!
//! A single-pass, pre-order walk over the metadata tree, implemented as an
//! explicit stack of cursors so that `skip_subtree` and `skip_siblings` can
//! adjust the traversal after an item has been returned. The iterator is a
//! read-only view; the graph must not be mutated while one is live.

use crate::core::node::XmpNode;
use crate::core::options::{IterOptions, PropertyOptions};

/// One visited property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmpIterItem {
    /// Namespace URI of the schema the property belongs to.
    pub schema_ns: String,
    /// Path of the property within its schema; empty for schema nodes.
    pub path: String,
    /// The value; empty for schema, struct, and array nodes.
    pub value: String,
    /// Form flags of the node.
    pub options: PropertyOptions,
}

struct Frame<'a> {
    node: &'a XmpNode,
    schema_ns: String,
    path: String,
    yielded: bool,
    next_qual: usize,
    next_child: usize,
}

/// Depth-first iterator over properties.
pub struct XmpIterator<'a> {
    options: IterOptions,
    stack: Vec<Frame<'a>>,
    /// Whether the start frame itself is reported.
    yield_start: bool,
}

impl<'a> XmpIterator<'a> {
    /// Iterate over the whole tree below the root.
    pub(crate) fn over_tree(root: &'a XmpNode, options: IterOptions) -> Self {
        Self {
            options,
            stack: vec![Frame {
                node: root,
                schema_ns: String::new(),
                path: String::new(),
                yielded: false,
                next_qual: 0,
                next_child: 0,
            }],
            yield_start: false,
        }
    }

    /// Iterate over one property subtree.
    pub(crate) fn over_property(
        node: &'a XmpNode,
        schema_ns: String,
        path: String,
        options: IterOptions,
    ) -> Self {
        Self {
            options,
            stack: vec![Frame {
                node,
                schema_ns,
                path,
                yielded: false,
                next_qual: 0,
                next_child: 0,
            }],
            yield_start: true,
        }
    }

    /// An iterator that yields nothing.
    pub(crate) fn empty(options: IterOptions) -> Self {
        Self {
            options,
            stack: Vec::new(),
            yield_start: false,
        }
    }

    /// Do not descend into the most recently returned node.
    pub fn skip_subtree(&mut self) {
        self.stack.pop();
    }

    /// Skip the remaining siblings of the most recently returned node.
    pub fn skip_siblings(&mut self) {
        self.stack.pop();
        if let Some(parent) = self.stack.last_mut() {
            parent.next_qual = parent.node.qualifiers_len();
            parent.next_child = parent.node.children_len();
        }
    }

    fn should_yield(&self, depth: usize, node: &XmpNode) -> bool {
        if depth == 0 && !self.yield_start {
            return false;
        }
        if self.options.just_children && depth != 1 {
            return false;
        }
        if self.options.just_leaf_nodes {
            return node.options().is_simple() && !node.options().is_schema_node();
        }
        true
    }

    fn make_item(&self, frame: &Frame<'a>) -> XmpIterItem {
        let path = if self.options.just_leaf_name {
            if frame.node.options().is_schema_node() {
                String::new()
            } else {
                frame.node.name().to_string()
            }
        } else {
            frame.path.clone()
        };
        XmpIterItem {
            schema_ns: frame.schema_ns.clone(),
            path,
            value: frame.node.value().to_string(),
            options: frame.node.options(),
        }
    }
}

impl<'a> Iterator for XmpIterator<'a> {
    type Item = XmpIterItem;

    fn next(&mut self) -> Option<XmpIterItem> {
        loop {
            let depth = self.stack.len().checked_sub(1)?;
            let top = self.stack.last_mut()?;

            if !top.yielded {
                top.yielded = true;
                let node = top.node;
                if self.should_yield(depth, node) {
                    let frame = self.stack.last().expect("frame just touched");
                    return Some(self.make_item(frame));
                }
                continue;
            }

            // With JustChildren, children of the start are not descended into.
            let descend = !self.options.just_children || depth == 0;
            if !descend {
                self.stack.pop();
                continue;
            }

            if !self.options.omit_qualifiers && top.next_qual < top.node.qualifiers_len() {
                let index = top.next_qual;
                top.next_qual += 1;
                let qual = top.node.qualifier(index + 1).expect("qualifier cursor valid");
                let path = if top.path.is_empty() {
                    format!("?{}", qual.name())
                } else {
                    format!("{}/?{}", top.path, qual.name())
                };
                let schema_ns = top.schema_ns.clone();
                self.stack.push(Frame {
                    node: qual,
                    schema_ns,
                    path,
                    yielded: false,
                    next_qual: 0,
                    next_child: 0,
                });
                continue;
            }

            if top.next_child < top.node.children_len() {
                let index = top.next_child;
                top.next_child += 1;
                let child = top.node.child(index + 1).expect("child cursor valid");

                let (schema_ns, path) = if top.node.options().is_schema_node() {
                    (top.schema_ns.clone(), child.name().to_string())
                } else if top.schema_ns.is_empty() {
                    // Children of the root are schema nodes.
                    (child.name().to_string(), String::new())
                } else if top.node.options().is_array() {
                    (top.schema_ns.clone(), format!("{}[{}]", top.path, index + 1))
                } else {
                    (top.schema_ns.clone(), format!("{}/{}", top.path, child.name()))
                };

                self.stack.push(Frame {
                    node: child,
                    schema_ns,
                    path,
                    yielded: false,
                    next_qual: 0,
                    next_child: 0,
                });
                continue;
            }

            self.stack.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::namespace::ns;
    use crate::core::node::{ARRAY_ITEM_NAME, XML_LANG};
    use crate::core::node_utils;

    fn sample_root() -> XmpNode {
        let mut root = XmpNode::new_root();
        let schema = node_utils::find_create_schema_node(&mut root, ns::DC).unwrap();
        schema
            .add_child(XmpNode::new(
                "dc:format",
                "image/jpeg",
                PropertyOptions::new(),
            ))
            .unwrap();
        let mut title = XmpNode::new(
            "dc:title",
            "",
            PropertyOptions::new().set_array_alt_text(true),
        );
        let mut item = XmpNode::new(ARRAY_ITEM_NAME, "Hello", PropertyOptions::new());
        item.add_qualifier(XmpNode::new(XML_LANG, "x-default", PropertyOptions::new()))
            .unwrap();
        title.add_child(item).unwrap();
        schema.add_child(title).unwrap();
        root
    }

    #[test]
    fn test_full_walk_paths() {
        let root = sample_root();
        let paths: Vec<String> = XmpIterator::over_tree(&root, IterOptions::new())
            .map(|item| item.path)
            .collect();
        assert_eq!(
            paths,
            vec![
                "".to_string(), // the dc schema node
                "dc:format".to_string(),
                "dc:title".to_string(),
                "dc:title[1]".to_string(),
                "dc:title[1]/?xml:lang".to_string(),
            ]
        );
    }

    #[test]
    fn test_schema_ns_reported() {
        let root = sample_root();
        let mut iter = XmpIterator::over_tree(&root, IterOptions::new());
        let schema = iter.next().unwrap();
        assert_eq!(schema.schema_ns, ns::DC);
        assert!(schema.options.is_schema_node());

        let format = iter.next().unwrap();
        assert_eq!(format.schema_ns, ns::DC);
        assert_eq!(format.value, "image/jpeg");
    }

    #[test]
    fn test_just_leaf_nodes() {
        let root = sample_root();
        let values: Vec<String> =
            XmpIterator::over_tree(&root, IterOptions::new().just_leaf_nodes(true))
                .map(|item| item.value)
                .collect();
        assert_eq!(values, vec!["image/jpeg", "Hello", "x-default"]);
    }

    #[test]
    fn test_just_leaf_name() {
        let root = sample_root();
        let names: Vec<String> = XmpIterator::over_tree(
            &root,
            IterOptions::new().just_leaf_nodes(true).just_leaf_name(true),
        )
        .map(|item| item.path)
        .collect();
        assert_eq!(names, vec!["dc:format", "[]", "xml:lang"]);
    }

    #[test]
    fn test_omit_qualifiers() {
        let root = sample_root();
        let paths: Vec<String> =
            XmpIterator::over_tree(&root, IterOptions::new().omit_qualifiers(true))
                .map(|item| item.path)
                .collect();
        assert!(!paths.iter().any(|p| p.contains("?xml:lang")));
    }

    #[test]
    fn test_just_children() {
        let root = sample_root();
        let schema = root.child(1).unwrap();
        let paths: Vec<String> = XmpIterator::over_property(
            schema,
            ns::DC.to_string(),
            String::new(),
            IterOptions::new().just_children(true),
        )
        .map(|item| item.path)
        .collect();
        assert_eq!(paths, vec!["dc:format", "dc:title"]);
    }

    #[test]
    fn test_skip_subtree() {
        let root = sample_root();
        let mut iter = XmpIterator::over_tree(&root, IterOptions::new());
        iter.next(); // schema
        iter.next(); // dc:format
        let title = iter.next().unwrap();
        assert_eq!(title.path, "dc:title");
        iter.skip_subtree();
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_skip_siblings() {
        let root = sample_root();
        let mut iter = XmpIterator::over_tree(&root, IterOptions::new());
        iter.next(); // schema
        let format = iter.next().unwrap();
        assert_eq!(format.path, "dc:format");
        iter.skip_siblings();
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_property_subtree_walk() {
        let root = sample_root();
        let schema = root.child(1).unwrap();
        let title_index = schema.find_child("dc:title").unwrap();
        let title = schema.child(title_index).unwrap();

        let paths: Vec<String> = XmpIterator::over_property(
            title,
            ns::DC.to_string(),
            "dc:title".to_string(),
            IterOptions::new(),
        )
        .map(|item| item.path)
        .collect();
        assert_eq!(paths, vec!["dc:title", "dc:title[1]", "dc:title[1]/?xml:lang"]);
    }
}
