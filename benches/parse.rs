use criterion::{black_box, criterion_group, criterion_main, Criterion};
use xmpcore::XmpMeta;

// Simple packet with one attribute property
const SIMPLE_XMP: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:xmp="http://ns.adobe.com/xap/1.0/">
  <rdf:Description rdf:about=""
                   xmp:CreatorTool="Adobe Photoshop CS2 Windows"/>
</rdf:RDF>
<?xpacket end="w"?>"#;

// Medium packet with attributes and a bag
const MEDIUM_XMP: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:xmp="http://ns.adobe.com/xap/1.0/"
         xmlns:dc="http://purl.org/dc/elements/1.1/"
         xmlns:exif="http://ns.adobe.com/exif/1.0/">
  <rdf:Description rdf:about=""
                   xmp:CreatorTool="Adobe Photoshop CS2 Windows"
                   xmp:CreateDate="2006-04-25T15:32:01+02:00"
                   xmp:ModifyDate="2006-04-27T15:38:36.655+02:00"
                   exif:PixelXDimension="200"
                   exif:PixelYDimension="200">
    <dc:subject>
      <rdf:Bag>
        <rdf:li>purple</rdf:li>
        <rdf:li>square</rdf:li>
        <rdf:li>test</rdf:li>
      </rdf:Bag>
    </dc:subject>
  </rdf:Description>
</rdf:RDF>
<?xpacket end="w"?>"#;

// Complex packet with alt-text, structs, and an alias to reconcile
const COMPLEX_XMP: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:xmp="http://ns.adobe.com/xap/1.0/"
         xmlns:dc="http://purl.org/dc/elements/1.1/"
         xmlns:xmpMM="http://ns.adobe.com/xap/1.0/mm/"
         xmlns:pdf="http://ns.adobe.com/pdf/1.3/"
         xmlns:tiff="http://ns.adobe.com/tiff/1.0/"
         xmlns:exif="http://ns.adobe.com/exif/1.0/">
  <rdf:Description rdf:about=""
                   xmp:CreatorTool="Adobe Photoshop CS2 Windows"
                   xmpMM:DocumentID="uuid:FE607D9B5FD4DA118B7787757E22306B"
                   tiff:Orientation="1"
                   exif:PixelXDimension="200">
    <pdf:Author>Test Author</pdf:Author>
    <dc:description>
      <rdf:Alt>
        <rdf:li xml:lang="x-default">a test file (öäüßÖÄÜ€中文)</rdf:li>
        <rdf:li xml:lang="de">eine Testdatei</rdf:li>
      </rdf:Alt>
    </dc:description>
    <dc:subject>
      <rdf:Bag>
        <rdf:li>purple</rdf:li>
        <rdf:li>square</rdf:li>
      </rdf:Bag>
    </dc:subject>
    <exif:Flash rdf:parseType="Resource">
      <exif:Fired>True</exif:Fired>
      <exif:Mode>1</exif:Mode>
    </exif:Flash>
  </rdf:Description>
</rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#;

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_simple", |b| {
        b.iter(|| black_box(SIMPLE_XMP).parse::<XmpMeta>().unwrap())
    });
    c.bench_function("parse_medium", |b| {
        b.iter(|| black_box(MEDIUM_XMP).parse::<XmpMeta>().unwrap())
    });
    c.bench_function("parse_complex", |b| {
        b.iter(|| black_box(COMPLEX_XMP).parse::<XmpMeta>().unwrap())
    });
}

fn bench_parse_buffer(c: &mut Criterion) {
    let utf16: Vec<u8> = MEDIUM_XMP
        .encode_utf16()
        .flat_map(|u| u.to_be_bytes())
        .collect();
    c.bench_function("parse_buffer_utf16", |b| {
        b.iter(|| XmpMeta::from_buffer(black_box(&utf16)).unwrap())
    });
}

criterion_group!(benches, bench_parse, bench_parse_buffer);
criterion_main!(benches);
