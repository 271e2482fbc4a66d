use crate::error::Result;
use crate::frequency::DfMode;
use crate::index::{DocId, DocMeta, InvertedIndex, Posting, TermId};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub created_at: String,
    pub version: u32,
    pub df_mode: DfMode,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn dictionary(&self) -> PathBuf { self.root.join("dictionary.bin") }
    fn docs(&self) -> PathBuf { self.root.join("docs.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    fn postings_dir(&self) -> PathBuf { self.root.join("postings") }
    fn postings_file(&self, term_id: TermId) -> PathBuf { self.postings_dir().join(format!("{term_id:08}.postings.bin")) }
    fn doc_id_map(&self) -> PathBuf { self.root.join("doc_id_map.bin") }

    /// Whether a complete index has been written here.
    pub fn exists(&self) -> bool {
        self.meta().is_file()
    }

    /// Whether `load_index` can find an index, either in place or left
    /// behind in `<root>.old` by a save interrupted mid-swap.
    pub fn has_saved_index(&self) -> bool {
        self.exists() || self.retired().exists()
    }

    fn retired(&self) -> IndexPaths {
        IndexPaths::new(self.sibling(".old"))
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.root.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "index".into());
        name.push(suffix);
        self.root.with_file_name(name)
    }
}

fn write_bin<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut f = File::create(path)?;
    let bytes = bincode::serialize(value)?;
    f.write_all(&bytes)?;
    Ok(())
}

fn read_bin<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Ok(bincode::deserialize(&buf)?)
}

pub fn save_dictionary(paths: &IndexPaths, dict: &(HashMap<String, TermId>, Vec<u32>)) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_bin(&paths.dictionary(), dict)
}

pub fn load_dictionary(paths: &IndexPaths) -> Result<(HashMap<String, TermId>, Vec<u32>)> {
    read_bin(&paths.dictionary())
}

pub fn save_docs(paths: &IndexPaths, docs: &HashMap<DocId, DocMeta>) -> Result<()> {
    write_bin(&paths.docs(), docs)
}

pub fn load_docs(paths: &IndexPaths) -> Result<HashMap<DocId, DocMeta>> {
    read_bin(&paths.docs())
}

pub fn save_postings_for_term(paths: &IndexPaths, term_id: TermId, postings: &[Posting]) -> Result<()> {
    create_dir_all(paths.postings_dir())?;
    write_bin(&paths.postings_file(term_id), postings)
}

pub fn load_postings_for_term(paths: &IndexPaths, term_id: TermId) -> Result<Vec<Posting>> {
    read_bin(&paths.postings_file(term_id))
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

pub fn save_doc_id_map(paths: &IndexPaths, map: &HashMap<String, DocId>) -> Result<()> {
    write_bin(&paths.doc_id_map(), map)
}

pub fn load_doc_id_map(paths: &IndexPaths) -> Result<HashMap<String, DocId>> {
    read_bin(&paths.doc_id_map())
}

fn write_all_parts(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    save_dictionary(paths, &(index.dictionary.clone(), index.df.clone()))?;
    create_dir_all(paths.postings_dir())?;
    for (term_id, plist) in &index.postings {
        save_postings_for_term(paths, *term_id, plist)?;
    }
    save_docs(paths, &index.docs)?;
    save_doc_id_map(paths, &index.doc_id_map)?;
    let meta = MetaFile {
        num_docs: index.num_docs,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: FORMAT_VERSION,
        df_mode: index.df_mode,
    };
    // meta.json last: its presence marks a complete index
    save_meta(paths, &meta)
}

/// Write the whole index into a staging directory next to `paths.root`, then
/// swap it into place.
pub fn save_index(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    let staging = IndexPaths::new(paths.sibling(".staging"));
    if staging.root.exists() {
        fs::remove_dir_all(&staging.root)?;
    }
    write_all_parts(&staging, index)?;

    let retired = paths.retired().root;
    if retired.exists() {
        fs::remove_dir_all(&retired)?;
    }
    if paths.root.exists() {
        fs::rename(&paths.root, &retired)?;
    }
    fs::rename(&staging.root, &paths.root)?;
    if retired.exists() {
        fs::remove_dir_all(&retired)?;
    }
    tracing::info!(root = %paths.root.display(), terms = index.num_terms(), docs = index.len(), "index saved");
    Ok(())
}

/// Read a saved index back into memory, postings included. Falls back to
/// `<root>.old` when `root` holds no complete index.
pub fn load_index(paths: &IndexPaths) -> Result<InvertedIndex> {
    let retired = paths.retired();
    if !paths.exists() && retired.exists() {
        tracing::warn!(root = %paths.root.display(), "index missing, loading the retired copy");
        return load_from(&retired);
    }
    load_from(paths)
}

fn load_from(paths: &IndexPaths) -> Result<InvertedIndex> {
    let meta = load_meta(paths)?;
    let (dictionary, df) = load_dictionary(paths)?;
    let docs = load_docs(paths)?;
    let doc_id_map = load_doc_id_map(paths)?;

    let mut terms = vec![String::new(); df.len()];
    for (term, &tid) in &dictionary {
        if let Some(slot) = terms.get_mut(tid as usize) {
            *slot = term.clone();
        }
    }

    let mut postings = HashMap::new();
    let mut doc_terms: HashMap<DocId, Vec<TermId>> = HashMap::new();
    for &tid in dictionary.values() {
        if !paths.postings_file(tid).is_file() {
            continue;
        }
        let plist = load_postings_for_term(paths, tid)?;
        for p in &plist {
            doc_terms.entry(p.doc_id).or_default().push(tid);
        }
        postings.insert(tid, plist);
    }
    let next_doc_id = docs.keys().max().map(|m| m + 1).unwrap_or(0);

    tracing::info!(root = %paths.root.display(), num_docs = meta.num_docs, created_at = %meta.created_at, "index loaded");
    Ok(InvertedIndex {
        dictionary,
        terms,
        df,
        postings,
        docs,
        doc_id_map,
        doc_terms,
        next_doc_id,
        num_docs: meta.num_docs,
        df_mode: meta.df_mode,
    })
}
