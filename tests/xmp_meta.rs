//! Tests for the XmpMeta API
//!
//! These exercise the public facade: property access, arrays, structs,
//! qualifiers, localized text, and the parse entry points.

use xmpcore::{xmp_ns, XmpMeta};

#[test]
fn new_empty() {
    let m = XmpMeta::new();
    assert!(!m.contains_property(xmp_ns::XMP, "CreatorTool"));
    assert_eq!(m.name(), "");
    assert!(m.packet_header().is_none());
}

#[test]
fn default() {
    let m = XmpMeta::default();
    assert!(!m.contains_property(xmp_ns::XMP, "CreatorTool"));
}

mod from_str {
    use pretty_assertions::assert_eq;
    use xmpcore::{xmp_ns, XmpError, XmpMeta};

    const SIMPLE_XMP: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:xmp="http://ns.adobe.com/xap/1.0/">
  <rdf:Description rdf:about=""
                   xmp:CreatorTool="Adobe Photoshop CS2 Windows"/>
</rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#;

    #[test]
    fn happy_path() {
        let m = SIMPLE_XMP.parse::<XmpMeta>().unwrap();
        assert_eq!(
            m.property(xmp_ns::XMP, "CreatorTool").unwrap().value,
            "Adobe Photoshop CS2 Windows"
        );
    }

    #[test]
    fn packet_header_is_captured() {
        let m = SIMPLE_XMP.parse::<XmpMeta>().unwrap();
        assert!(m
            .packet_header()
            .unwrap()
            .contains("W5M0MpCehiHzreSzNTczkc9d"));
    }

    #[test]
    fn invalid_xml() {
        let result = "not valid xml".parse::<XmpMeta>();
        assert!(matches!(result, Err(XmpError::BadXmp(_))));
    }

    #[test]
    fn scenario_basic_simple_property() {
        let xml = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"><rdf:Description rdf:about="" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:format>image/jpeg</dc:format></rdf:Description></rdf:RDF></x:xmpmeta>"#;
        let m = xml.parse::<XmpMeta>().unwrap();
        assert_eq!(
            m.property(xmp_ns::DC, "dc:format").unwrap().value,
            "image/jpeg"
        );
    }
}

mod property_operations {
    use pretty_assertions::assert_eq;
    use xmpcore::{register_namespace, xmp_ns, PropertyOptions, XmpError, XmpMeta};

    #[test]
    fn set_and_get() {
        let mut m = XmpMeta::new();
        m.set_property(xmp_ns::XMP, "CreatorTool", "TestApp").unwrap();
        assert_eq!(m.property(xmp_ns::XMP, "CreatorTool").unwrap().value, "TestApp");
    }

    #[test]
    fn prefixed_and_plain_paths_are_equivalent() {
        let mut m = XmpMeta::new();
        m.set_property(xmp_ns::DC, "format", "image/png").unwrap();
        assert_eq!(m.property(xmp_ns::DC, "dc:format").unwrap().value, "image/png");
    }

    #[test]
    fn nested_struct_paths() {
        let mut m = XmpMeta::new();
        m.set_property(xmp_ns::EXIF, "Flash/exif:Fired", "True").unwrap();
        assert!(m.property(xmp_ns::EXIF, "Flash").unwrap().options.is_struct());
        assert_eq!(m.property(xmp_ns::EXIF, "Flash/exif:Fired").unwrap().value, "True");
    }

    #[test]
    fn custom_namespace() {
        let prefix = register_namespace("http://example.com/test/1.0/", "tst").unwrap();
        assert!(prefix.ends_with(':'));

        let mut m = XmpMeta::new();
        m.set_property("http://example.com/test/1.0/", "Flavor", "vanilla")
            .unwrap();
        assert_eq!(
            m.property("http://example.com/test/1.0/", "Flavor").unwrap().value,
            "vanilla"
        );
    }

    #[test]
    fn composite_value_refused() {
        let mut m = XmpMeta::new();
        let result = m.set_property_with_options(
            xmp_ns::DC,
            "subject",
            "a value",
            PropertyOptions::new().set_array(true),
        );
        assert!(matches!(result, Err(XmpError::BadOptions(_))));
    }

    #[test]
    fn delete_reaps_empty_schema() {
        let mut m = XmpMeta::new();
        m.set_property(xmp_ns::PDF, "Keywords", "k").unwrap();
        m.delete_property(xmp_ns::PDF, "Keywords").unwrap();
        assert!(!m.contains_property(xmp_ns::PDF, "Keywords"));
        // The packet serializes as an empty description again.
        let packet = m.to_string_with_options(Default::default()).unwrap();
        assert!(packet.contains("<rdf:Description rdf:about=\"\"/>"));
    }
}

mod arrays {
    use pretty_assertions::assert_eq;
    use xmpcore::{xmp_ns, PropertyOptions, XmpMeta, LAST_ITEM};

    fn seq() -> PropertyOptions {
        PropertyOptions::new().set_array_ordered(true)
    }

    #[test]
    fn append_get_insert_delete() {
        let mut m = XmpMeta::new();
        m.append_array_item(xmp_ns::DC, "creator", seq(), "Author1").unwrap();
        m.append_array_item(xmp_ns::DC, "creator", seq(), "Author2").unwrap();
        assert_eq!(m.array_len(xmp_ns::DC, "creator"), 2);

        assert_eq!(m.array_item(xmp_ns::DC, "creator", 1).unwrap().value, "Author1");
        assert_eq!(
            m.array_item(xmp_ns::DC, "creator", LAST_ITEM).unwrap().value,
            "Author2"
        );

        m.insert_array_item(xmp_ns::DC, "creator", 1, "Author0").unwrap();
        assert_eq!(m.array_item(xmp_ns::DC, "creator", 1).unwrap().value, "Author0");
        assert_eq!(m.array_len(xmp_ns::DC, "creator"), 3);

        m.delete_array_item(xmp_ns::DC, "creator", 1).unwrap();
        assert_eq!(m.array_item(xmp_ns::DC, "creator", 1).unwrap().value, "Author1");
    }

    #[test]
    fn array_paths_via_property() {
        let mut m = XmpMeta::new();
        m.append_array_item(xmp_ns::DC, "creator", seq(), "Alice").unwrap();
        assert_eq!(m.property(xmp_ns::DC, "creator[1]").unwrap().value, "Alice");
        assert_eq!(m.property(xmp_ns::DC, "creator[last()]").unwrap().value, "Alice");
        assert!(m.property(xmp_ns::DC, "creator[2]").is_none());
    }

    #[test]
    fn array_options_reported() {
        let mut m = XmpMeta::new();
        m.append_array_item(
            xmp_ns::DC,
            "subject",
            PropertyOptions::new().set_array(true),
            "kw",
        )
        .unwrap();
        let prop = m.property(xmp_ns::DC, "subject").unwrap();
        assert!(prop.options.is_array());
        assert!(!prop.options.is_array_ordered());
    }
}

mod qualifiers {
    use pretty_assertions::assert_eq;
    use xmpcore::{xmp_ns, XmpMeta};

    #[test]
    fn qualifier_round_trip() {
        let mut m = XmpMeta::new();
        m.set_property(xmp_ns::DC, "identifier", "doc-1").unwrap();
        m.set_qualifier(xmp_ns::DC, "identifier", xmp_ns::XMP_IDQ, "Scheme", "local")
            .unwrap();

        assert_eq!(
            m.qualifier(xmp_ns::DC, "identifier", xmp_ns::XMP_IDQ, "Scheme")
                .unwrap()
                .value,
            "local"
        );

        // The qualifier is addressable through the path syntax too.
        assert_eq!(
            m.property(xmp_ns::DC, "identifier/?xmpidq:Scheme").unwrap().value,
            "local"
        );
        assert_eq!(
            m.property(xmp_ns::DC, "identifier/@xmpidq:Scheme").unwrap().value,
            "local"
        );
    }

    #[test]
    fn lang_qualifier_via_path() {
        let mut m = XmpMeta::new();
        m.set_localized_text(xmp_ns::DC, "title", "", "en-US", "Hello").unwrap();
        assert_eq!(
            m.property(xmp_ns::DC, "title[2]/?xml:lang").unwrap().value,
            "en-US"
        );
    }
}

mod localized_text {
    use pretty_assertions::assert_eq;
    use xmpcore::{xmp_ns, XmpMeta};

    #[test]
    fn scenario_x_default_promotion() {
        let mut m = XmpMeta::new();
        m.set_localized_text(xmp_ns::DC, "title", "", "en-US", "Hello").unwrap();

        assert_eq!(m.array_len(xmp_ns::DC, "title"), 2);
        let first = m.property(xmp_ns::DC, "title[1]").unwrap();
        let second = m.property(xmp_ns::DC, "title[2]").unwrap();
        assert_eq!(first.value, "Hello");
        assert_eq!(second.value, "Hello");
        assert_eq!(
            m.property(xmp_ns::DC, "title[1]/?xml:lang").unwrap().value,
            "x-default"
        );
        assert_eq!(
            m.property(xmp_ns::DC, "title[2]/?xml:lang").unwrap().value,
            "en-US"
        );
    }

    #[test]
    fn selection_order() {
        let mut m = XmpMeta::new();
        m.set_localized_text(xmp_ns::DC, "title", "", "x-default", "Default").unwrap();
        m.set_localized_text(xmp_ns::DC, "title", "", "de-DE", "Hallo").unwrap();
        m.set_localized_text(xmp_ns::DC, "title", "", "en-GB", "British").unwrap();

        let (value, lang) = m.localized_text(xmp_ns::DC, "title", "de", "de-CH").unwrap();
        assert_eq!((value.as_str(), lang.as_str()), ("Hallo", "de-DE"));

        let (value, lang) = m.localized_text(xmp_ns::DC, "title", "en", "en-AU").unwrap();
        assert_eq!((value.as_str(), lang.as_str()), ("British", "en-GB"));

        // The lone x-default adopted the first language's value; later
        // languages left it alone.
        let (value, lang) = m.localized_text(xmp_ns::DC, "title", "ja", "ja-JP").unwrap();
        assert_eq!((value.as_str(), lang.as_str()), ("Hallo", "x-default"));
    }

    #[test]
    fn lang_selector_path() {
        let mut m = XmpMeta::new();
        m.set_localized_text(xmp_ns::DC, "title", "", "en-US", "Hello").unwrap();
        assert_eq!(
            m.property(xmp_ns::DC, "title[?xml:lang=\"en-US\"]").unwrap().value,
            "Hello"
        );
    }

    #[test]
    fn alias_alt_text_names_work() {
        let mut m = XmpMeta::new();
        // pdf:Title addresses the x-default item of dc:title.
        m.set_localized_text(xmp_ns::PDF, "Title", "", "en-US", "Doc").unwrap();
        assert_eq!(m.array_len(xmp_ns::DC, "title"), 2);

        let (value, lang) = m.localized_text(xmp_ns::PDF, "Title", "", "x-default").unwrap();
        assert_eq!(value, "Doc");
        assert_eq!(lang, "x-default");

        // The plain property getter through the alias sees the default item.
        assert_eq!(m.property(xmp_ns::PDF, "Title").unwrap().value, "Doc");
    }
}

mod iteration {
    use xmpcore::{xmp_ns, IterOptions, XmpMeta};

    fn sample() -> XmpMeta {
        let mut m = XmpMeta::new();
        m.set_property(xmp_ns::XMP, "CreatorTool", "App").unwrap();
        m.set_localized_text(xmp_ns::DC, "title", "", "en", "Hi").unwrap();
        m
    }

    #[test]
    fn full_iteration_visits_everything() {
        let m = sample();
        let paths: Vec<String> = m.iter(IterOptions::new()).map(|i| i.path).collect();
        assert!(paths.contains(&"xmp:CreatorTool".to_string()));
        assert!(paths.contains(&"dc:title".to_string()));
        assert!(paths.contains(&"dc:title[1]".to_string()));
    }

    #[test]
    fn leaves_only() {
        let m = sample();
        let items: Vec<_> = m
            .iter(IterOptions::new().just_leaf_nodes(true))
            .collect();
        assert!(items.iter().all(|i| i.options.is_simple()));
        assert!(items.iter().any(|i| i.value == "App"));
    }

    #[test]
    fn skip_subtree_prunes_array_items() {
        let m = sample();
        let mut iter = m.iter(IterOptions::new());
        let mut seen_items = 0;
        while let Some(item) = iter.next() {
            if item.path == "dc:title" {
                iter.skip_subtree();
            }
            if item.path.starts_with("dc:title[") {
                seen_items += 1;
            }
        }
        assert_eq!(seen_items, 0);
    }

    #[test]
    fn property_iteration() {
        let m = sample();
        let paths: Vec<String> = m
            .iter_property(xmp_ns::DC, "title", IterOptions::new())
            .map(|i| i.path)
            .collect();
        assert_eq!(paths[0], "dc:title");
        assert!(paths.contains(&"dc:title[1]".to_string()));
    }
}
