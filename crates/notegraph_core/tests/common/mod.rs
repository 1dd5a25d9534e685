#![allow(dead_code)]

use notegraph_core::{AttributeRow, BranchRow, GraphCache, GraphSnapshot, NoteRow};

/// Small geography graph:
///
/// ```text
/// root
/// ├── europe (#region=Europe, inheritable)
/// │   ├── austria (#capital=Vienna #population ~template=tpl)
/// │   │   └── vienna (#city ~country=austria)
/// │   └── czechia (#capital=Prague #population)
/// │       └── prague (#city ~country=czechia)
/// ├── hello
/// │   └── shared (#shared)
/// ├── archive (#archived, inheritable)
/// │   └── shared (second placement)
/// ├── tpl (#kind=country)
/// └── labelled (#label=Text, inheritable)
///     └── labelled_child
/// ```
pub fn world_snapshot() -> GraphSnapshot {
    GraphSnapshot {
        notes: vec![
            NoteRow::new("root", "root"),
            NoteRow::new("europe", "Europe"),
            NoteRow::new("austria", "Austria"),
            NoteRow::new("vienna", "Vienna"),
            NoteRow::new("czechia", "Czech Republic"),
            NoteRow::new("prague", "Prague"),
            NoteRow::new("hello", "Hello World Notes"),
            NoteRow::new("archive", "Old stuff"),
            NoteRow::new("shared", "Shared note"),
            NoteRow::new("tpl", "Country template"),
            NoteRow::new("labelled", "Labelled"),
            NoteRow::new("labelled_child", "Labelled child"),
        ],
        branches: vec![
            BranchRow::new("b_europe", "europe", "root").with_position(10),
            BranchRow::new("b_austria", "austria", "europe").with_position(10),
            BranchRow::new("b_vienna", "vienna", "austria"),
            BranchRow::new("b_czechia", "czechia", "europe").with_position(20),
            BranchRow::new("b_prague", "prague", "czechia"),
            BranchRow::new("b_hello", "hello", "root").with_position(20),
            BranchRow::new("b_archive", "archive", "root").with_position(30),
            // Listed first so the archived placement is linked first.
            BranchRow::new("b_shared_archived", "shared", "archive"),
            BranchRow::new("b_shared", "shared", "hello"),
            BranchRow::new("b_tpl", "tpl", "root").with_position(40),
            BranchRow::new("b_labelled", "labelled", "root").with_position(50),
            BranchRow::new("b_labelled_child", "labelled_child", "labelled"),
        ],
        attributes: vec![
            AttributeRow::label("a_region", "europe", "region", "Europe").inheritable(),
            AttributeRow::label("a_austria_capital", "austria", "capital", "Vienna"),
            AttributeRow::label("a_austria_population", "austria", "population", "8859000"),
            AttributeRow::relation("a_austria_template", "austria", "template", "tpl"),
            AttributeRow::label("a_czechia_capital", "czechia", "capital", "Prague"),
            AttributeRow::label("a_czechia_population", "czechia", "population", "10650000"),
            AttributeRow::label("a_vienna_city", "vienna", "city", ""),
            AttributeRow::relation("a_vienna_country", "vienna", "country", "austria"),
            AttributeRow::label("a_prague_city", "prague", "city", ""),
            AttributeRow::relation("a_prague_country", "prague", "country", "czechia"),
            AttributeRow::label("a_archived", "archive", "archived", "").inheritable(),
            AttributeRow::label("a_shared", "shared", "shared", ""),
            AttributeRow::label("a_tpl_kind", "tpl", "kind", "country"),
            AttributeRow::label("a_labelled", "labelled", "label", "Text").inheritable(),
        ],
    }
}

/// Template graph:
///
/// ```text
/// root
/// ├── design (#n=x)
/// ├── tier (~template=design)
/// ├── user (~template=tier)
/// └── pnote (~template=design, inheritable)
///     └── cnote
/// ```
pub fn templates_snapshot() -> GraphSnapshot {
    GraphSnapshot {
        notes: vec![
            NoteRow::new("root", "root"),
            NoteRow::new("design", "Design"),
            NoteRow::new("tier", "Tier"),
            NoteRow::new("user", "User"),
            NoteRow::new("pnote", "pnote"),
            NoteRow::new("cnote", "cnote"),
        ],
        branches: vec![
            BranchRow::new("b_design", "design", "root").with_position(10),
            BranchRow::new("b_tier", "tier", "root").with_position(20),
            BranchRow::new("b_user", "user", "root").with_position(30),
            BranchRow::new("b_pnote", "pnote", "root").with_position(40),
            BranchRow::new("b_cnote", "cnote", "pnote"),
        ],
        attributes: vec![
            AttributeRow::label("a_design_n", "design", "n", "x"),
            AttributeRow::relation("a_tier_template", "tier", "template", "design"),
            AttributeRow::relation("a_user_template", "user", "template", "tier"),
            AttributeRow::relation("a_pnote_template", "pnote", "template", "design")
                .inheritable(),
        ],
    }
}

pub fn templates() -> GraphCache {
    GraphCache::from_snapshot(templates_snapshot())
}

pub fn world() -> GraphCache {
    GraphCache::from_snapshot(world_snapshot())
}

/// Attribute names (`#name` / `~name`) effective on `note_id`, sorted.
pub fn attribute_names(graph: &GraphCache, note_id: &str) -> Vec<String> {
    let mut names: Vec<String> = graph
        .attributes(note_id)
        .iter()
        .filter_map(|id| graph.attribute(id))
        .map(|attr| format!("{}{}", attr.kind.marker(), attr.name))
        .collect();
    names.sort();
    names
}

pub fn sorted(mut ids: Vec<String>) -> Vec<String> {
    ids.sort();
    ids
}

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
