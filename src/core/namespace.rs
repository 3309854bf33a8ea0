//! Schema registry for XMP
//!
//! The registry maps namespace URIs to prefixes and back, and holds the alias
//! table used by the path parser and the normalizer. One registry exists per
//! process, guarded by an exclusive lock; read operations copy snapshots out
//! so callers never iterate while holding the lock.

use crate::core::error::{XmpError, XmpResult};
use crate::core::options::AliasForm;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

static GLOBAL_REGISTRY: OnceLock<RwLock<SchemaRegistry>> = OnceLock::new();

/// Standard XMP namespace URIs.
pub mod ns {
    /// XML namespace (for `xml:lang`)
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    /// RDF syntax namespace
    pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    /// The `x:xmpmeta` wrapper namespace
    pub const X: &str = "adobe:ns:meta/";
    /// Dublin Core namespace
    pub const DC: &str = "http://purl.org/dc/elements/1.1/";
    /// Legacy Dublin Core URI occasionally found in old packets
    pub const DC_DEPRECATED: &str = "http://purl.org/dc/1.1/";
    /// IPTC Core namespace
    pub const IPTC_CORE: &str = "http://iptc.org/std/Iptc4xmpCore/1.0/xmlns/";
    /// IPTC Extension namespace
    pub const IPTC_EXT: &str = "http://iptc.org/std/Iptc4xmpExt/2008-02-29/";
    /// DICOM medical imaging namespace
    pub const DICOM: &str = "http://ns.adobe.com/DICOM/";
    /// PLUS licensing namespace
    pub const PLUS: &str = "http://ns.useplus.org/ldf/xmp/1.0/";

    /// XMP Basic namespace
    pub const XMP: &str = "http://ns.adobe.com/xap/1.0/";
    /// XMP Rights Management namespace
    pub const XMP_RIGHTS: &str = "http://ns.adobe.com/xap/1.0/rights/";
    /// XMP Media Management namespace
    pub const XMP_MM: &str = "http://ns.adobe.com/xap/1.0/mm/";
    /// XMP Basic Job Ticket namespace
    pub const XMP_BJ: &str = "http://ns.adobe.com/xap/1.0/bj/";
    /// XMP Note namespace (extended-packet link)
    pub const XMP_NOTE: &str = "http://ns.adobe.com/xmp/note/";
    /// XMP Dynamic Media namespace
    pub const XMP_DM: &str = "http://ns.adobe.com/xmp/1.0/DynamicMedia/";
    /// XMP identifier qualifier namespace
    pub const XMP_IDQ: &str = "http://ns.adobe.com/xmp/Identifier/qual/1.0/";

    /// PDF namespace
    pub const PDF: &str = "http://ns.adobe.com/pdf/1.3/";
    /// PDF/X namespace
    pub const PDFX: &str = "http://ns.adobe.com/pdfx/1.3/";
    /// PDF/X ID namespace
    pub const PDFX_ID: &str = "http://www.npes.org/pdfx/ns/id/";
    /// PDF/A ID namespace
    pub const PDFA_ID: &str = "http://www.aiim.org/pdfa/ns/id/";
    /// PDF/A schema container namespace
    pub const PDFA_SCHEMA: &str = "http://www.aiim.org/pdfa/ns/schema#";
    /// PDF/A property namespace
    pub const PDFA_PROPERTY: &str = "http://www.aiim.org/pdfa/ns/property#";
    /// PDF/A type namespace
    pub const PDFA_TYPE: &str = "http://www.aiim.org/pdfa/ns/type#";
    /// PDF/A field namespace
    pub const PDFA_FIELD: &str = "http://www.aiim.org/pdfa/ns/field#";
    /// PDF/A extension namespace
    pub const PDFA_EXTENSION: &str = "http://www.aiim.org/pdfa/ns/extension/";

    /// Photoshop namespace
    pub const PHOTOSHOP: &str = "http://ns.adobe.com/photoshop/1.0/";
    /// Photoshop Album namespace
    pub const PS_ALBUM: &str = "http://ns.adobe.com/album/1.0/";
    /// EXIF namespace
    pub const EXIF: &str = "http://ns.adobe.com/exif/1.0/";
    /// EXIF 2.3 (CIPA) namespace
    pub const EXIF_EX: &str = "http://cipa.jp/exif/1.0/";
    /// EXIF auxiliary namespace
    pub const EXIF_AUX: &str = "http://ns.adobe.com/exif/1.0/aux/";
    /// TIFF namespace
    pub const TIFF: &str = "http://ns.adobe.com/tiff/1.0/";
    /// PNG namespace
    pub const PNG: &str = "http://ns.adobe.com/png/1.0/";
    /// JPEG namespace
    pub const JPEG: &str = "http://ns.adobe.com/jpeg/1.0/";
    /// JPEG 2000 namespace
    pub const JP2K: &str = "http://ns.adobe.com/jp2k/1.0/";
    /// Camera Raw settings namespace
    pub const CAMERA_RAW: &str = "http://ns.adobe.com/camera-raw-settings/1.0/";
    /// Adobe Stock Photo namespace
    pub const ADOBE_STOCK_PHOTO: &str = "http://ns.adobe.com/StockPhoto/1.0/";
    /// Creator Atom namespace
    pub const CREATOR_ATOM: &str = "http://ns.adobe.com/creatorAtom/1.0/";
    /// ASF (Windows Media) namespace
    pub const ASF: &str = "http://ns.adobe.com/asf/1.0/";
    /// WAV namespace
    pub const WAV: &str = "http://ns.adobe.com/xmp/wav/1.0/";
    /// Broadcast WAV bext namespace
    pub const BWF: &str = "http://ns.adobe.com/bwf/bext/1.0/";
    /// RIFF INFO namespace
    pub const RIFF_INFO: &str = "http://ns.adobe.com/riff/info/";
    /// Adobe script namespace
    pub const SCRIPT: &str = "adobe:ns:meta/scriptingxmp/";
    /// Transform XMP namespace
    pub const TXMP: &str = "http://ns.adobe.com/TransformXMP/";
    /// SWF namespace
    pub const SWF: &str = "http://ns.adobe.com/swf/1.0/";
    /// Adobe transient namespace
    pub const TRANSIENT: &str = "http://ns.adobe.com/xmp/transient/1.0/";

    /// iView MediaPro namespace
    pub const MEDIAPRO: &str = "http://ns.iview-multimedia.com/mediapro/1.0/";
    /// Expression Media namespace
    pub const EXPRESSION_MEDIA: &str = "http://ns.microsoft.com/expressionmedia/1.0/";
    /// Microsoft Photo namespace
    pub const MICROSOFT_PHOTO: &str = "http://ns.microsoft.com/photo/1.0/";
    /// Lightroom namespace
    pub const LIGHTROOM: &str = "http://ns.adobe.com/lightroom/1.0/";
    /// Metadata Working Group regions namespace
    pub const MWG_RS: &str = "http://www.metadataworkinggroup.com/schemas/regions/";
    /// Metadata Working Group keywords namespace
    pub const MWG_KW: &str = "http://www.metadataworkinggroup.com/schemas/keywords/";
    /// Darwin Core namespace
    pub const DWC: &str = "http://rs.tdwg.org/dwc/index.htm";
    /// Google depth-map namespace
    pub const GDEPTH: &str = "http://ns.google.com/photos/1.0/depthmap/";

    /// Dimensions structure type namespace
    pub const TYPE_DIMENSIONS: &str = "http://ns.adobe.com/xap/1.0/sType/Dimensions#";
    /// ResourceEvent structure type namespace
    pub const TYPE_RESOURCE_EVENT: &str = "http://ns.adobe.com/xap/1.0/sType/ResourceEvent#";
    /// ResourceRef structure type namespace
    pub const TYPE_RESOURCE_REF: &str = "http://ns.adobe.com/xap/1.0/sType/ResourceRef#";
    /// Version structure type namespace
    pub const TYPE_ST_VERSION: &str = "http://ns.adobe.com/xap/1.0/sType/Version#";
    /// Job structure type namespace
    pub const TYPE_ST_JOB: &str = "http://ns.adobe.com/xap/1.0/sType/Job#";
    /// ManifestItem structure type namespace
    pub const TYPE_MANIFEST_ITEM: &str = "http://ns.adobe.com/xap/1.0/sType/ManifestItem#";
    /// Font structure type namespace
    pub const TYPE_FONT: &str = "http://ns.adobe.com/xap/1.0/sType/Font#";
    /// Text namespace
    pub const TYPE_TEXT: &str = "http://ns.adobe.com/xap/1.0/t/";
    /// Paged-file namespace
    pub const TYPE_PAGED_FILE: &str = "http://ns.adobe.com/xap/1.0/t/pg/";
    /// Graphics namespace
    pub const TYPE_GRAPHICS: &str = "http://ns.adobe.com/xap/1.0/g/";
    /// Image namespace
    pub const TYPE_IMAGE: &str = "http://ns.adobe.com/xap/1.0/g/img/";
}

/// A registered alias: where the actual property lives and in which form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasInfo {
    /// Namespace URI of the actual property
    pub namespace: String,
    /// Registered prefix of the actual namespace (with the trailing colon)
    pub prefix: String,
    /// Local name of the actual property
    pub prop_name: String,
    /// Placement of the alias relative to the actual property
    pub form: AliasForm,
}

impl AliasInfo {
    /// Qualified name of the actual property, e.g. `dc:creator`.
    pub fn qualified_name(&self) -> String {
        format!("{}{}", self.prefix, self.prop_name)
    }
}

/// Bijective URI/prefix maps plus the alias table.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    uri_to_prefix: HashMap<String, String>,
    prefix_to_uri: HashMap<String, String>,
    aliases: HashMap<String, AliasInfo>,
}

impl SchemaRegistry {
    /// Create a registry pre-populated with the standard namespaces and
    /// aliases.
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.register_standard_namespaces();
        registry.register_standard_aliases();
        registry
    }

    /// Register a namespace URI with a suggested prefix.
    ///
    /// Returns the prefix actually registered, always with a trailing colon.
    /// If the URI is already known its existing prefix is returned unchanged.
    /// If the suggested prefix is taken by another URI, `base_N_:` is derived
    /// with the smallest free `N`.
    pub fn register(&mut self, uri: &str, suggested_prefix: &str) -> XmpResult<String> {
        if uri.is_empty() {
            return Err(XmpError::BadParam("empty namespace URI".to_string()));
        }
        if suggested_prefix.is_empty() {
            return Err(XmpError::BadParam("empty namespace prefix".to_string()));
        }

        if let Some(prefix) = self.uri_to_prefix.get(uri) {
            return Ok(prefix.clone());
        }

        let base = suggested_prefix.trim_end_matches(':');
        if !is_ncname(base) {
            return Err(XmpError::BadSchema(format!(
                "prefix '{}' is not a legal XML name",
                suggested_prefix
            )));
        }

        let mut prefix = format!("{}:", base);
        if self.prefix_to_uri.contains_key(&prefix) {
            let mut n = 1;
            loop {
                let candidate = format!("{}_{}_:", base, n);
                if !self.prefix_to_uri.contains_key(&candidate) {
                    prefix = candidate;
                    break;
                }
                n += 1;
            }
        }

        self.uri_to_prefix.insert(uri.to_string(), prefix.clone());
        self.prefix_to_uri.insert(prefix.clone(), uri.to_string());
        Ok(prefix)
    }

    /// Get the registered prefix (with colon) for a namespace URI.
    pub fn prefix_for_uri(&self, uri: &str) -> Option<&str> {
        self.uri_to_prefix.get(uri).map(|s| s.as_str())
    }

    /// Get the URI for a registered prefix. The trailing colon is optional.
    pub fn uri_for_prefix(&self, prefix: &str) -> Option<&str> {
        if let Some(uri) = self.prefix_to_uri.get(prefix) {
            return Some(uri.as_str());
        }
        let with_colon = format!("{}:", prefix.trim_end_matches(':'));
        self.prefix_to_uri.get(&with_colon).map(|s| s.as_str())
    }

    /// All registered (uri, prefix) pairs.
    pub fn namespaces(&self) -> Vec<(String, String)> {
        self.uri_to_prefix
            .iter()
            .map(|(uri, prefix)| (uri.clone(), prefix.clone()))
            .collect()
    }

    /// Register an alias from one simple property name onto another.
    pub fn register_alias(
        &mut self,
        alias_ns: &str,
        alias_prop: &str,
        actual_ns: &str,
        actual_prop: &str,
        form: AliasForm,
    ) -> XmpResult<()> {
        if alias_prop.is_empty() || actual_prop.is_empty() {
            return Err(XmpError::BadParam("empty property name".to_string()));
        }
        // Only simple names can be aliased; paths are not allowed.
        for name in [alias_prop, actual_prop] {
            if !is_ncname(name) {
                return Err(XmpError::BadXPath(format!(
                    "alias endpoints must be simple names, got '{}'",
                    name
                )));
            }
        }

        let alias_prefix = self
            .prefix_for_uri(alias_ns)
            .ok_or_else(|| {
                XmpError::BadSchema(format!("unregistered alias namespace '{}'", alias_ns))
            })?
            .to_string();
        let actual_prefix = self
            .prefix_for_uri(actual_ns)
            .ok_or_else(|| {
                XmpError::BadSchema(format!("unregistered actual namespace '{}'", actual_ns))
            })?
            .to_string();

        let alias_key = format!("{}{}", alias_prefix, alias_prop);
        let actual_key = format!("{}{}", actual_prefix, actual_prop);

        // Refuse chains: the actual must not itself be an alias, and the
        // alias must not already be the target of another alias.
        if self.aliases.contains_key(&actual_key) {
            return Err(XmpError::BadSchema(format!(
                "cannot alias to the alias '{}'",
                actual_key
            )));
        }
        if self
            .aliases
            .values()
            .any(|info| info.qualified_name() == alias_key)
        {
            return Err(XmpError::BadSchema(format!(
                "cannot alias the alias target '{}'",
                alias_key
            )));
        }
        if self.aliases.contains_key(&alias_key) {
            return Err(XmpError::BadSchema(format!(
                "alias '{}' is already registered",
                alias_key
            )));
        }

        self.aliases.insert(
            alias_key,
            AliasInfo {
                namespace: actual_ns.to_string(),
                prefix: actual_prefix,
                prop_name: actual_prop.to_string(),
                form,
            },
        );
        Ok(())
    }

    /// Resolve an alias by namespace and property name.
    pub fn resolve_alias(&self, alias_ns: &str, alias_prop: &str) -> Option<AliasInfo> {
        let prefix = self.prefix_for_uri(alias_ns)?;
        self.find_alias(&format!("{}{}", prefix, alias_prop))
    }

    /// Resolve an alias by qualified name, e.g. `xmp:Author`.
    pub fn find_alias(&self, qualified_name: &str) -> Option<AliasInfo> {
        self.aliases.get(qualified_name).cloned()
    }

    /// Qualified names of all aliases defined in the given namespace.
    pub fn aliases_in_namespace(&self, alias_ns: &str) -> Vec<String> {
        let Some(prefix) = self.prefix_for_uri(alias_ns) else {
            return Vec::new();
        };
        let mut names: Vec<String> = self
            .aliases
            .keys()
            .filter(|qname| qname.starts_with(prefix))
            .cloned()
            .collect();
        names.sort();
        names
    }

    fn register_standard_namespaces(&mut self) {
        let standard: &[(&str, &str)] = &[
            (ns::XML, "xml"),
            (ns::RDF, "rdf"),
            (ns::X, "x"),
            (ns::DC, "dc"),
            (ns::IPTC_CORE, "Iptc4xmpCore"),
            (ns::IPTC_EXT, "Iptc4xmpExt"),
            (ns::DICOM, "DICOM"),
            (ns::PLUS, "plus"),
            (ns::XMP, "xmp"),
            (ns::XMP_RIGHTS, "xmpRights"),
            (ns::XMP_MM, "xmpMM"),
            (ns::XMP_BJ, "xmpBJ"),
            (ns::XMP_NOTE, "xmpNote"),
            (ns::XMP_DM, "xmpDM"),
            (ns::XMP_IDQ, "xmpidq"),
            (ns::PDF, "pdf"),
            (ns::PDFX, "pdfx"),
            (ns::PDFX_ID, "pdfxid"),
            (ns::PDFA_ID, "pdfaid"),
            (ns::PDFA_SCHEMA, "pdfaSchema"),
            (ns::PDFA_PROPERTY, "pdfaProperty"),
            (ns::PDFA_TYPE, "pdfaType"),
            (ns::PDFA_FIELD, "pdfaField"),
            (ns::PDFA_EXTENSION, "pdfaExtension"),
            (ns::PHOTOSHOP, "photoshop"),
            (ns::PS_ALBUM, "album"),
            (ns::EXIF, "exif"),
            (ns::EXIF_EX, "exifEX"),
            (ns::EXIF_AUX, "aux"),
            (ns::TIFF, "tiff"),
            (ns::PNG, "png"),
            (ns::JPEG, "jpeg"),
            (ns::JP2K, "jp2k"),
            (ns::CAMERA_RAW, "crs"),
            (ns::ADOBE_STOCK_PHOTO, "bmsp"),
            (ns::CREATOR_ATOM, "creatorAtom"),
            (ns::ASF, "asf"),
            (ns::WAV, "wav"),
            (ns::BWF, "bext"),
            (ns::RIFF_INFO, "riffinfo"),
            (ns::SCRIPT, "xmpScript"),
            (ns::TXMP, "txmp"),
            (ns::SWF, "swf"),
            (ns::TRANSIENT, "xmpx"),
            (ns::MEDIAPRO, "mediapro"),
            (ns::EXPRESSION_MEDIA, "expressionmedia"),
            (ns::MICROSOFT_PHOTO, "MicrosoftPhoto"),
            (ns::LIGHTROOM, "lr"),
            (ns::MWG_RS, "mwg-rs"),
            (ns::MWG_KW, "mwg-kw"),
            (ns::DWC, "dwc"),
            (ns::GDEPTH, "GDepth"),
            (ns::TYPE_DIMENSIONS, "stDim"),
            (ns::TYPE_RESOURCE_EVENT, "stEvt"),
            (ns::TYPE_RESOURCE_REF, "stRef"),
            (ns::TYPE_ST_VERSION, "stVer"),
            (ns::TYPE_ST_JOB, "stJob"),
            (ns::TYPE_MANIFEST_ITEM, "stMfs"),
            (ns::TYPE_FONT, "stFnt"),
            (ns::TYPE_TEXT, "xmpT"),
            (ns::TYPE_PAGED_FILE, "xmpTPg"),
            (ns::TYPE_GRAPHICS, "xmpG"),
            (ns::TYPE_IMAGE, "xmpGImg"),
        ];
        for (uri, prefix) in standard {
            // Standard entries never collide.
            self.register(uri, prefix)
                .expect("standard namespace registration failed");
        }
    }

    fn register_standard_aliases(&mut self) {
        use AliasForm::{AltTextItem, ArrayItem, Simple};

        let standard: &[(&str, &str, &str, &str, AliasForm)] = &[
            (ns::XMP, "Author", ns::DC, "creator", ArrayItem),
            (ns::XMP, "Authors", ns::DC, "creator", Simple),
            (ns::XMP, "Description", ns::DC, "description", Simple),
            (ns::XMP, "Format", ns::DC, "format", Simple),
            (ns::XMP, "Keywords", ns::DC, "subject", Simple),
            (ns::XMP, "Locale", ns::DC, "language", Simple),
            (ns::XMP, "Title", ns::DC, "title", Simple),
            (ns::XMP_RIGHTS, "Copyright", ns::DC, "rights", Simple),
            (ns::PDF, "Author", ns::DC, "creator", ArrayItem),
            (ns::PDF, "BaseURL", ns::XMP, "BaseURL", Simple),
            (ns::PDF, "CreationDate", ns::XMP, "CreateDate", Simple),
            (ns::PDF, "Creator", ns::XMP, "CreatorTool", Simple),
            (ns::PDF, "ModDate", ns::XMP, "ModifyDate", Simple),
            (ns::PDF, "Subject", ns::DC, "description", AltTextItem),
            (ns::PDF, "Title", ns::DC, "title", AltTextItem),
            (ns::PHOTOSHOP, "Author", ns::DC, "creator", ArrayItem),
            (ns::PHOTOSHOP, "Caption", ns::DC, "description", AltTextItem),
            (ns::PHOTOSHOP, "Copyright", ns::DC, "rights", AltTextItem),
            (ns::PHOTOSHOP, "Keywords", ns::DC, "subject", Simple),
            (ns::PHOTOSHOP, "Marked", ns::XMP_RIGHTS, "Marked", Simple),
            (ns::PHOTOSHOP, "Title", ns::DC, "title", AltTextItem),
            (
                ns::PHOTOSHOP,
                "WebStatement",
                ns::XMP_RIGHTS,
                "WebStatement",
                Simple,
            ),
            (ns::TIFF, "Artist", ns::DC, "creator", ArrayItem),
            (ns::TIFF, "Copyright", ns::DC, "rights", Simple),
            (ns::TIFF, "DateTime", ns::XMP, "ModifyDate", Simple),
            (ns::TIFF, "ImageDescription", ns::DC, "description", Simple),
            (ns::TIFF, "Software", ns::XMP, "CreatorTool", Simple),
            (ns::EXIF, "DateTimeDigitized", ns::XMP, "CreateDate", Simple),
            (ns::PNG, "Author", ns::DC, "creator", ArrayItem),
            (ns::PNG, "Copyright", ns::DC, "rights", AltTextItem),
            (ns::PNG, "CreationTime", ns::XMP, "CreateDate", Simple),
            (ns::PNG, "Description", ns::DC, "description", AltTextItem),
            (ns::PNG, "ModificationTime", ns::XMP, "ModifyDate", Simple),
            (ns::PNG, "Software", ns::XMP, "CreatorTool", Simple),
            (ns::PNG, "Title", ns::DC, "title", AltTextItem),
        ];
        for (alias_ns, alias_prop, actual_ns, actual_prop, form) in standard {
            self.register_alias(alias_ns, alias_prop, actual_ns, actual_prop, *form)
                .expect("standard alias registration failed");
        }
    }
}

/// Check for a legal XML NCName (no colon).
pub(crate) fn is_ncname(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn global_registry() -> &'static RwLock<SchemaRegistry> {
    GLOBAL_REGISTRY.get_or_init(|| RwLock::new(SchemaRegistry::new()))
}

/// Register a namespace in the process-wide registry.
///
/// Returns the prefix actually registered, with the trailing colon.
pub fn register_namespace(uri: &str, suggested_prefix: &str) -> XmpResult<String> {
    let mut guard = global_registry()
        .write()
        .expect("schema registry lock poisoned");
    guard.register(uri, suggested_prefix)
}

/// Get the registered prefix for a namespace URI.
pub fn prefix_for_uri(uri: &str) -> Option<String> {
    let guard = global_registry()
        .read()
        .expect("schema registry lock poisoned");
    guard.prefix_for_uri(uri).map(|s| s.to_string())
}

/// Get the namespace URI for a registered prefix.
pub fn uri_for_prefix(prefix: &str) -> Option<String> {
    let guard = global_registry()
        .read()
        .expect("schema registry lock poisoned");
    guard.uri_for_prefix(prefix).map(|s| s.to_string())
}

/// All registered (uri, prefix) pairs, copied out as a snapshot.
pub fn registered_namespaces() -> Vec<(String, String)> {
    let guard = global_registry()
        .read()
        .expect("schema registry lock poisoned");
    guard.namespaces()
}

/// Register an alias in the process-wide registry.
pub fn register_alias(
    alias_ns: &str,
    alias_prop: &str,
    actual_ns: &str,
    actual_prop: &str,
    form: AliasForm,
) -> XmpResult<()> {
    let mut guard = global_registry()
        .write()
        .expect("schema registry lock poisoned");
    guard.register_alias(alias_ns, alias_prop, actual_ns, actual_prop, form)
}

/// Resolve an alias by namespace and property name.
pub fn resolve_alias(alias_ns: &str, alias_prop: &str) -> Option<AliasInfo> {
    let guard = global_registry()
        .read()
        .expect("schema registry lock poisoned");
    guard.resolve_alias(alias_ns, alias_prop)
}

/// Resolve an alias by qualified name, e.g. `tiff:DateTime`.
pub fn find_alias(qualified_name: &str) -> Option<AliasInfo> {
    let guard = global_registry()
        .read()
        .expect("schema registry lock poisoned");
    guard.find_alias(qualified_name)
}

/// Qualified names of all aliases defined in a namespace.
pub fn aliases_in_namespace(alias_ns: &str) -> Vec<String> {
    let guard = global_registry()
        .read()
        .expect("schema registry lock poisoned");
    guard.aliases_in_namespace(alias_ns)
}

/// Replace the process-wide registry with a freshly built one.
///
/// Intended for tests that register throwaway namespaces.
pub fn reset_registry() {
    let mut guard = global_registry()
        .write()
        .expect("schema registry lock poisoned");
    *guard = SchemaRegistry::new();
}
