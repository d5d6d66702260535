//! Tests for top-level span classification.

use pdfscope_core::Document;
use pdfscope_core::document::Category;
use pdfscope_core::model::Kind;

fn build_pdf() -> Vec<u8> {
    let mut out = b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n".to_vec();
    for object in [
        "1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n",
        "2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n",
        "3 0 obj\n<< /Type /Page /Parent 2 0 R /Resources << /Font << /F1 5 0 R >> >> >>\nendobj\n",
        "4 0 obj\n<< /Length 9 >>\nstream\nBT 1 Tj ET\nendstream\nendobj\n",
        "5 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>\nendobj\n",
        "6 0 obj\n<< /Filter /FlateDecode /Length 0 >>\nstream\n\nendstream\nendobj\n",
        "7 0 obj\n<< /Creator (hand) >>\nendobj\n",
        "8 0 obj\n[1 2]\nendobj\n",
        "9 0 obj\n42\nendobj\n",
        "10 0 obj\n<< /Type /XObject >>\nendobj\n",
        "11 0 obj\n<< /Misc 1 >>\nendobj\n",
        "12 0 obj\n(text)\nendobj\n",
    ] {
        out.extend_from_slice(object.as_bytes());
    }
    out.extend_from_slice(b"xref\n0 1\n0000000000 65535 f \ntrailer\n<< /Size 13 >>\nstartxref\n0\n%%EOF\n");
    out
}

#[test]
fn test_categories_in_file_order() {
    let doc = Document::from_bytes(&build_pdf()).unwrap();
    let categories: Vec<Category> = doc.layout().into_iter().map(|e| e.category).collect();

    assert_eq!(
        categories,
        vec![
            Category::Comment,
            Category::Whitespace,
            Category::Comment,
            Category::Catalog,
            Category::DocumentStructure,
            Category::Page,
            Category::StreamData,
            Category::Font,
            Category::CompressedData,
            Category::AuthorInfo,
            Category::List,
            Category::Primitive,
            Category::OtherTyped("XObject".into()),
            Category::UnspecifiedDict,
            Category::Unspecified(Kind::LiteralString),
            Category::DataIndex,
            Category::DataIndex,
            Category::Whitespace,
        ]
    );
}

#[test]
fn test_layout_covers_every_byte() {
    let pdf = build_pdf();
    let doc = Document::from_bytes(&pdf).unwrap();
    let entries = doc.layout();

    assert_eq!(entries[0].start, 0);
    for pair in entries.windows(2) {
        assert_eq!(pair[0].start + pair[0].size, pair[1].start);
    }
    let last = entries.last().unwrap();
    assert_eq!(last.start + last.size, pdf.len());
    assert_eq!(doc.size(), pdf.len());
}

#[test]
fn test_labels() {
    assert_eq!(Category::DataIndex.label(), "Data Index");
    assert_eq!(Category::Unspecified(Kind::Name).to_string(), "Unspecified (Name)");
}
