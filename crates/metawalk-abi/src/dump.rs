//! Human-readable dump of a reflected layout.
//!
//! ```text
//! struct Shapes.Point
//!   field_count = 2
//!   x +0  Si  [var]
//!   y +8  Si
//! ```

use std::fmt::Write as _;

use metawalk_core::Colors;

use crate::field_descriptor::FieldRecordFlags;
use crate::layout::TypeLayout;

/// Render `layout` as text, one line per field.
pub fn dump(layout: &TypeLayout, colors: Colors) -> String {
    let mut out = String::new();
    dump_header(&mut out, layout, colors);
    dump_fields(&mut out, layout, colors);
    out
}

fn dump_header(out: &mut String, layout: &TypeLayout, c: Colors) {
    let name = layout.qualified_name.as_deref().unwrap_or("<unnamed>");
    let header = format!("{} {name}", layout.kind.name());
    out.push_str(&c.paint(c.ty, &header));
    if let Some(superclass) = &layout.superclass {
        write!(out, " : {}", c.paint(c.ty, superclass)).unwrap();
    }
    out.push('\n');

    match layout.field_count {
        Some(count) => writeln!(out, "  field_count = {count}").unwrap(),
        None => writeln!(out, "  field_count = {}", c.paint(c.detail, "unsupported")).unwrap(),
    }
}

fn dump_fields(out: &mut String, layout: &TypeLayout, c: Colors) {
    let offsets: Vec<String> = layout
        .fields
        .iter()
        .map(|field| match field.offset {
            Some(offset) => format!("+{offset}"),
            None => "-".to_string(),
        })
        .collect();
    let name_width = layout.fields.iter().map(|f| f.name.len()).max().unwrap_or(0);
    let offset_width = offsets.iter().map(String::len).max().unwrap_or(0);

    for (field, offset) in layout.fields.iter().zip(&offsets) {
        let name = format!("{:<name_width$}", field.name);
        let offset = format!("{offset:>offset_width$}");
        write!(
            out,
            "  {} {}",
            c.paint(c.field, &name),
            c.paint(c.detail, &offset)
        )
        .unwrap();
        if let Some(ty) = &field.mangled_type_name {
            write!(out, "  {}", c.paint(c.detail, ty)).unwrap();
        }
        let flags = flag_names(field.flags);
        if !flags.is_empty() {
            write!(out, "  [{}]", flags.join(", ")).unwrap();
        }
        out.push('\n');
    }
}

/// Names of the known flag bits, then any leftover bits in hex.
fn flag_names(flags: FieldRecordFlags) -> Vec<String> {
    const KNOWN: [(u32, &str); 3] = [
        (FieldRecordFlags::IS_VAR, "var"),
        (FieldRecordFlags::IS_INDIRECT_CASE, "indirect"),
        (FieldRecordFlags::IS_ARTIFICIAL, "artificial"),
    ];

    let mut names = Vec::new();
    let mut rest = flags.bits();
    for (mask, name) in KNOWN {
        if flags.contains(mask) {
            names.push(name.to_string());
            rest &= !mask;
        }
    }
    if rest != 0 {
        names.push(format!("{rest:#x}"));
    }
    names
}
