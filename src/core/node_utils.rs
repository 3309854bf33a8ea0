//! Tree walking helpers shared by the facade, parser, and normalizer
//!
//! Path resolution walks an expanded [`XmpPath`] down from the root,
//! optionally creating intermediate containers. Created intermediates are
//! marked implicit and reaped by [`prune_implicit`] when an operation leaves
//! them childless.

use crate::core::error::{XmpError, XmpResult};
use crate::core::node::{XmpNode, ARRAY_ITEM_NAME, XML_LANG, X_DEFAULT};
use crate::core::options::PropertyOptions;
use crate::core::xpath::{XmpPath, XmpPathStep};

/// Outcome of the language selection rules over an alt-text array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LangMatch {
    /// The array has no usable items.
    None,
    /// Exact match on the specific language (1-based index).
    Specific(usize),
    /// Exactly one item matched the generic language.
    SingleGeneric(usize),
    /// Several items matched the generic language; the first one.
    MultipleGeneric(usize),
    /// Fell back to the `x-default` item.
    XDefault(usize),
    /// Fell back to the first item.
    First(usize),
}

impl LangMatch {
    pub(crate) fn index(&self) -> Option<usize> {
        match self {
            LangMatch::None => None,
            LangMatch::Specific(i)
            | LangMatch::SingleGeneric(i)
            | LangMatch::MultipleGeneric(i)
            | LangMatch::XDefault(i)
            | LangMatch::First(i) => Some(*i),
        }
    }
}

/// Find the node addressed by an expanded path. Returns `None` on the first
/// missing step.
pub(crate) fn find_node<'a>(root: &'a XmpNode, path: &XmpPath) -> Option<&'a XmpNode> {
    let mut node = root;
    for step in path.steps() {
        node = follow_step(node, step)?;
    }
    Some(node)
}

/// Mutable variant of [`find_node`]; never creates.
pub(crate) fn find_node_mut<'a>(
    root: &'a mut XmpNode,
    steps: &[XmpPathStep],
) -> Option<&'a mut XmpNode> {
    let mut node = root;
    for step in steps {
        let index = step_target_index(node, step)?;
        node = match index {
            StepTarget::Child(i) => node.children.get_mut(i - 1)?,
            StepTarget::Qualifier(i) => node.qualifiers.get_mut(i - 1)?,
        };
    }
    Some(node)
}

/// Walk a path, creating missing containers. The created leaf (and any
/// created intermediates) are marked implicit; the caller clears the flag on
/// the leaf once it holds a real value.
pub(crate) fn find_create_node<'a>(
    root: &'a mut XmpNode,
    path: &XmpPath,
) -> XmpResult<&'a mut XmpNode> {
    let mut node = root;
    for step in path.steps() {
        node = follow_step_create(node, step)?;
    }
    Ok(node)
}

enum StepTarget {
    Child(usize),
    Qualifier(usize),
}

fn step_target_index(node: &XmpNode, step: &XmpPathStep) -> Option<StepTarget> {
    let child = |i| Some(StepTarget::Child(i));
    match step {
        XmpPathStep::Schema(uri) => node.find_child(uri).and_then(child),
        XmpPathStep::StructField(name) => node.find_child(name).and_then(child),
        XmpPathStep::Qualifier(name) => node.find_qualifier(name).map(StepTarget::Qualifier),
        XmpPathStep::ArrayIndex(i) => {
            if *i >= 1 && *i <= node.children_len() {
                child(*i)
            } else {
                None
            }
        }
        XmpPathStep::ArrayLast => {
            if node.has_children() {
                child(node.children_len())
            } else {
                None
            }
        }
        XmpPathStep::FieldSelector { field, value } => node
            .children()
            .position(|item| {
                item.children()
                    .any(|f| f.name() == field && f.value() == value)
            })
            .and_then(|i| child(i + 1)),
        XmpPathStep::QualSelector { qualifier, value } => node
            .children()
            .position(|item| {
                item.qualifiers()
                    .any(|q| q.name() == qualifier && q.value() == value)
            })
            .and_then(|i| child(i + 1)),
    }
}

fn follow_step<'a>(node: &'a XmpNode, step: &XmpPathStep) -> Option<&'a XmpNode> {
    match step_target_index(node, step)? {
        StepTarget::Child(i) => node.child(i),
        StepTarget::Qualifier(i) => node.qualifier(i),
    }
}

fn follow_step_create<'a>(
    parent: &'a mut XmpNode,
    step: &XmpPathStep,
) -> XmpResult<&'a mut XmpNode> {
    match step {
        XmpPathStep::Schema(uri) => {
            if parent.find_child(uri).is_none() {
                parent.add_child(XmpNode::new_schema(uri.clone()))?;
            }
            let index = parent.find_child(uri).expect("schema node just ensured");
            Ok(parent.child_mut(index).expect("schema index valid"))
        }
        XmpPathStep::StructField(name) => {
            coerce_to_struct(parent)?;
            if parent.find_child(name).is_none() {
                let mut child = XmpNode::new(name.clone(), "", PropertyOptions::new());
                child.implicit = true;
                parent.add_child(child)?;
            }
            let index = parent.find_child(name).expect("field just ensured");
            Ok(parent.child_mut(index).expect("field index valid"))
        }
        XmpPathStep::Qualifier(name) => {
            if parent.find_qualifier(name).is_none() {
                let mut qual = XmpNode::new(name.clone(), "", PropertyOptions::new());
                qual.implicit = true;
                parent.add_qualifier(qual)?;
            }
            let index = parent.find_qualifier(name).expect("qualifier just ensured");
            Ok(parent
                .qualifiers
                .get_mut(index - 1)
                .expect("qualifier index valid"))
        }
        XmpPathStep::ArrayIndex(i) => {
            coerce_to_array(parent)?;
            let len = parent.children_len();
            if *i >= 1 && *i <= len {
                Ok(parent.child_mut(*i).expect("array index valid"))
            } else if *i == len + 1 {
                // Creating exactly one past the end appends.
                let mut item = XmpNode::new(ARRAY_ITEM_NAME, "", PropertyOptions::new());
                item.implicit = true;
                parent.add_child(item)?;
                Ok(parent.child_mut(len + 1).expect("appended item valid"))
            } else {
                Err(XmpError::BadXPath(format!(
                    "array index {} out of bounds for {} items",
                    i, len
                )))
            }
        }
        XmpPathStep::ArrayLast => {
            coerce_to_array(parent)?;
            if !parent.has_children() {
                let mut item = XmpNode::new(ARRAY_ITEM_NAME, "", PropertyOptions::new());
                item.implicit = true;
                parent.add_child(item)?;
            }
            let last = parent.children_len();
            Ok(parent.child_mut(last).expect("last item valid"))
        }
        XmpPathStep::QualSelector { qualifier, value } if qualifier == XML_LANG => {
            // Language selectors create the missing item; x-default lands at
            // the front.
            coerce_to_array(parent)?;
            if lookup_language_item(parent, value).is_none() {
                append_lang_item(parent, value, "")?;
                if let Some(index) = lookup_language_item(parent, value) {
                    let item = parent.child_mut(index).expect("item just appended");
                    item.implicit = true;
                }
            }
            let index = lookup_language_item(parent, value).expect("item just ensured");
            Ok(parent.child_mut(index).expect("item index valid"))
        }
        XmpPathStep::FieldSelector { .. } | XmpPathStep::QualSelector { .. } => {
            // Other selectors never create items; the target must exist.
            match step_target_index(parent, step) {
                Some(StepTarget::Child(i)) => Ok(parent.child_mut(i).expect("selector index")),
                _ => Err(XmpError::BadXPath(
                    "no array item matches the selector".to_string(),
                )),
            }
        }
    }
}

/// Give a formless intermediate node struct form, or fail.
fn coerce_to_struct(node: &XmpNode) -> XmpResult<()> {
    if node.options.is_schema_node() || node.options.is_struct() {
        return Ok(());
    }
    if node.options.is_array() {
        return Err(XmpError::BadXPath(
            "named children are not allowed in arrays".to_string(),
        ));
    }
    Ok(())
}

fn coerce_to_array(node: &XmpNode) -> XmpResult<()> {
    if node.options.is_array() {
        return Ok(());
    }
    if node.options.is_struct() || node.options.is_schema_node() {
        return Err(XmpError::BadXPath(
            "indexed children are only allowed in arrays".to_string(),
        ));
    }
    Ok(())
}

/// Fix the form of an implicit intermediate once its role is known.
pub(crate) fn apply_intermediate_forms(root: &mut XmpNode, path: &XmpPath) {
    let steps = path.steps();
    for i in 0..steps.len().saturating_sub(1) {
        let needs_struct = matches!(steps[i + 1], XmpPathStep::StructField(_));
        let needs_array = matches!(
            steps[i + 1],
            XmpPathStep::ArrayIndex(_)
                | XmpPathStep::ArrayLast
                | XmpPathStep::FieldSelector { .. }
                | XmpPathStep::QualSelector { .. }
        );
        let needs_alt_text = matches!(
            &steps[i + 1],
            XmpPathStep::QualSelector { qualifier, .. } if qualifier == XML_LANG
        );
        if let Some(node) = find_node_mut(root, &steps[..=i]) {
            if node.options.is_schema_node() {
                continue;
            }
            if needs_struct && !node.options.is_struct() && !node.options.is_array() {
                node.options = node.options.set_struct(true);
            }
            if needs_array && !node.options.is_array() && !node.options.is_struct() {
                node.options = if needs_alt_text {
                    node.options.set_array_alt_text(true)
                } else {
                    node.options.set_array(true).set_array_ordered(true)
                };
            }
        }
    }
}

/// Delete the node addressed by the path. Returns true if something was
/// removed. An implicit schema node left childless is reaped.
pub(crate) fn delete_node(root: &mut XmpNode, path: &XmpPath) -> bool {
    let steps = path.steps();
    let (last, front) = match steps.split_last() {
        Some(pair) => pair,
        None => return false,
    };
    let Some(parent) = find_node_mut(root, front) else {
        return false;
    };
    let removed = match step_target_index(parent, last) {
        Some(StepTarget::Child(i)) => {
            parent.children.remove(i - 1);
            true
        }
        Some(StepTarget::Qualifier(i)) => {
            let name = parent.qualifiers[i - 1].name.clone();
            parent.remove_qualifier(&name)
        }
        None => false,
    };
    if removed {
        prune_empty_schemas(root);
    }
    removed
}

/// Remove childless, valueless implicit nodes left behind by a failed or
/// partial path resolution.
pub(crate) fn prune_implicit(node: &mut XmpNode) {
    for child in &mut node.children {
        prune_implicit(child);
    }
    node.children.retain(|c| {
        !(c.implicit && !c.has_children() && c.value().is_empty() && !c.has_qualifiers())
    });
}

/// Remove schema nodes that have no children left.
pub(crate) fn prune_empty_schemas(root: &mut XmpNode) {
    root.children
        .retain(|schema| !(schema.options.is_schema_node() && !schema.has_children()));
}

/// Find or create the schema node for a namespace URI.
pub(crate) fn find_create_schema_node<'a>(
    root: &'a mut XmpNode,
    uri: &str,
) -> XmpResult<&'a mut XmpNode> {
    if root.find_child(uri).is_none() {
        root.add_child(XmpNode::new_schema(uri))?;
    }
    let index = root.find_child(uri).expect("schema node just ensured");
    Ok(root.child_mut(index).expect("schema index valid"))
}

/// 1-based index of the item carrying `xml:lang="lang"`, if any.
pub(crate) fn lookup_language_item(array: &XmpNode, lang: &str) -> Option<usize> {
    array
        .children()
        .position(|item| item.lang() == Some(lang))
        .map(|i| i + 1)
}

/// Apply the language selection rules: exact specific match, generic-prefix
/// match, `x-default`, first item.
pub(crate) fn choose_localized_text(
    array: &XmpNode,
    generic_lang: &str,
    specific_lang: &str,
) -> XmpResult<LangMatch> {
    if !array.options.is_array_alt_text() {
        return Err(XmpError::BadXPath(
            "localized text requires an alt-text array".to_string(),
        ));
    }
    if !array.has_children() {
        return Ok(LangMatch::None);
    }

    if let Some(index) = lookup_language_item(array, specific_lang) {
        return Ok(LangMatch::Specific(index));
    }

    if !generic_lang.is_empty() {
        let matches: Vec<usize> = array
            .children()
            .enumerate()
            .filter(|(_, item)| {
                item.lang()
                    .map(|lang| {
                        lang == generic_lang
                            || (lang.starts_with(generic_lang)
                                && lang[generic_lang.len()..].starts_with('-'))
                    })
                    .unwrap_or(false)
            })
            .map(|(i, _)| i + 1)
            .collect();
        match matches.as_slice() {
            [] => {}
            [single] => return Ok(LangMatch::SingleGeneric(*single)),
            [first, ..] => return Ok(LangMatch::MultipleGeneric(*first)),
        }
    }

    if let Some(index) = lookup_language_item(array, X_DEFAULT) {
        return Ok(LangMatch::XDefault(index));
    }

    Ok(LangMatch::First(1))
}

/// Append a language item; `x-default` goes to the front.
pub(crate) fn append_lang_item(array: &mut XmpNode, lang: &str, value: &str) -> XmpResult<()> {
    let mut item = XmpNode::new(ARRAY_ITEM_NAME, value, PropertyOptions::new());
    item.add_qualifier(XmpNode::new(XML_LANG, lang, PropertyOptions::new()))?;
    if lang == X_DEFAULT && array.has_children() {
        array.add_child_at(1, item)
    } else {
        array.add_child(item)
    }
}

/// Move the `x-default` item to the front of an alt-text array.
pub(crate) fn normalize_lang_array(array: &mut XmpNode) {
    if let Some(index) = lookup_language_item(array, X_DEFAULT) {
        if index > 1 {
            let item = array.children.remove(index - 1);
            array.children.insert(0, item);
        }
    }
}

/// Promote an `rdf:Alt` array to alt-text when its items carry languages.
pub(crate) fn detect_alt_text(array: &mut XmpNode) {
    if array.options.is_array_alternate() && !array.options.is_array_alt_text() {
        let has_lang = array.children().any(|item| item.options().has_lang());
        if has_lang {
            array.options = array.options.set_array_alt_text(true);
            normalize_lang_array(array);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::namespace::ns;
    use crate::core::xpath::expand_xpath;

    fn root_with(path: &XmpPath, value: &str) -> XmpNode {
        let mut root = XmpNode::new_root();
        {
            let node = find_create_node(&mut root, path).unwrap();
            node.set_value(value);
            node.implicit = false;
        }
        apply_intermediate_forms(&mut root, path);
        root
    }

    #[test]
    fn test_find_create_simple_property() {
        let path = expand_xpath(ns::DC, "format").unwrap();
        let root = root_with(&path, "image/jpeg");

        let schema = root.child(1).unwrap();
        assert!(schema.options().is_schema_node());
        assert_eq!(schema.name(), ns::DC);

        let node = find_node(&root, &path).unwrap();
        assert_eq!(node.value(), "image/jpeg");
    }

    #[test]
    fn test_find_create_nested_struct() {
        let path = expand_xpath(ns::EXIF, "Flash/exif:Fired").unwrap();
        let root = root_with(&path, "True");

        let flash_path = expand_xpath(ns::EXIF, "Flash").unwrap();
        let flash = find_node(&root, &flash_path).unwrap();
        assert!(flash.options().is_struct());
        assert_eq!(flash.children_len(), 1);
    }

    #[test]
    fn test_find_create_array_items() {
        let path = expand_xpath(ns::DC, "creator[1]").unwrap();
        let mut root = root_with(&path, "First");

        // Appending one past the end works, further out fails.
        let second = expand_xpath(ns::DC, "creator[2]").unwrap();
        find_create_node(&mut root, &second).unwrap().set_value("Second");
        let fifth = expand_xpath(ns::DC, "creator[5]").unwrap();
        assert!(matches!(
            find_create_node(&mut root, &fifth),
            Err(XmpError::BadXPath(_))
        ));

        let array_path = expand_xpath(ns::DC, "creator").unwrap();
        let array = find_node(&root, &array_path).unwrap();
        assert!(array.options().is_array());
        assert_eq!(array.children_len(), 2);

        let last = expand_xpath(ns::DC, "creator[last()]").unwrap();
        assert_eq!(find_node(&root, &last).unwrap().value(), "Second");
    }

    #[test]
    fn test_field_selectors_never_create() {
        let path = expand_xpath(ns::XMP_MM, "History[stEvt:action=\"saved\"]").unwrap();
        let mut root = XmpNode::new_root();
        assert!(find_create_node(&mut root, &path).is_err());
    }

    #[test]
    fn test_lang_selector_creates_item() {
        let path = expand_xpath(ns::DC, "title[?xml:lang=\"x-default\"]").unwrap();
        let mut root = XmpNode::new_root();
        {
            let item = find_create_node(&mut root, &path).unwrap();
            item.set_value("made");
            item.implicit = false;
        }
        apply_intermediate_forms(&mut root, &path);

        let array_path = expand_xpath(ns::DC, "title").unwrap();
        let array = find_node(&root, &array_path).unwrap();
        assert_eq!(array.children_len(), 1);
        assert_eq!(array.child(1).unwrap().lang(), Some(X_DEFAULT));
    }

    #[test]
    fn test_delete_reaps_empty_schema() {
        let path = expand_xpath(ns::DC, "format").unwrap();
        let mut root = root_with(&path, "image/png");
        assert!(delete_node(&mut root, &path));
        assert_eq!(root.children_len(), 0);
        assert!(!delete_node(&mut root, &path));
    }

    #[test]
    fn test_prune_implicit() {
        let path = expand_xpath(ns::DC, "a/dc:b/dc:c").unwrap();
        let mut root = XmpNode::new_root();
        // Simulate an abandoned resolution: everything implicit, no value.
        find_create_node(&mut root, &path).unwrap();
        prune_implicit(&mut root);
        prune_empty_schemas(&mut root);
        assert_eq!(root.children_len(), 0);
    }

    fn alt_array(items: &[(&str, &str)]) -> XmpNode {
        let mut array = XmpNode::new(
            "dc:title",
            "",
            PropertyOptions::new().set_array_alt_text(true),
        );
        for (lang, value) in items {
            append_lang_item(&mut array, lang, value).unwrap();
        }
        array
    }

    #[test]
    fn test_choose_localized_text_order() {
        let array = alt_array(&[("x-default", "d"), ("en-US", "us"), ("en-GB", "gb"), ("de", "de")]);

        assert_eq!(
            choose_localized_text(&array, "en", "en-US").unwrap(),
            LangMatch::Specific(2)
        );
        assert_eq!(
            choose_localized_text(&array, "de", "de-CH").unwrap(),
            LangMatch::SingleGeneric(4)
        );
        assert_eq!(
            choose_localized_text(&array, "en", "en-AU").unwrap(),
            LangMatch::MultipleGeneric(2)
        );
        assert_eq!(
            choose_localized_text(&array, "fr", "fr-FR").unwrap(),
            LangMatch::XDefault(1)
        );

        let no_default = alt_array(&[("it", "it")]);
        assert_eq!(
            choose_localized_text(&no_default, "fr", "fr-FR").unwrap(),
            LangMatch::First(1)
        );
    }

    #[test]
    fn test_generic_match_needs_subtag_boundary() {
        // "eng" must not match generic "en".
        let array = alt_array(&[("eng", "x")]);
        assert_eq!(
            choose_localized_text(&array, "en", "en-US").unwrap(),
            LangMatch::First(1)
        );
    }

    #[test]
    fn test_append_lang_item_puts_x_default_first() {
        let mut array = alt_array(&[("en", "english")]);
        append_lang_item(&mut array, X_DEFAULT, "default").unwrap();
        assert_eq!(array.child(1).unwrap().lang(), Some(X_DEFAULT));
        assert_eq!(array.child(2).unwrap().lang(), Some("en"));
    }

    #[test]
    fn test_detect_alt_text() {
        let mut array = XmpNode::new(
            "dc:title",
            "",
            PropertyOptions::new().set_array_alternate(true),
        );
        let mut item = XmpNode::new(ARRAY_ITEM_NAME, "hello", PropertyOptions::new());
        item.add_qualifier(XmpNode::new(XML_LANG, "en", PropertyOptions::new()))
            .unwrap();
        array.add_child(item).unwrap();

        detect_alt_text(&mut array);
        assert!(array.options().is_array_alt_text());
    }
}
