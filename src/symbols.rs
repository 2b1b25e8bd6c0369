//! Symbol table shared by both passes. A single ordered collection holds
//! primary definitions alongside `.entry` promotions and external use-site
//! records; queries filter by kind.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Address of a code word.
    Code,
    /// Offset into the data image, rebased past the code segment after the
    /// first pass.
    Data,
    /// Imported symbol, resolved at link time; stored value is 0.
    External,
    /// One use site of an external symbol; the value is the address of the
    /// operand word that references it.
    ExternalReference,
    /// Promotion marker for an exported symbol.
    Entry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub value: i32,
    pub kind: SymbolKind,
}

/// Kept sorted ascending by value at all times so output emission can walk
/// it front to back. Entries with equal values keep insertion order.
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: i32, kind: SymbolKind) {
        let at = self.entries.partition_point(|s| s.value <= value);
        self.entries.insert(
            at,
            Symbol {
                name: name.into(),
                value,
                kind,
            },
        );
    }

    /// Finds the first entry matching `name` with one of the given kinds.
    pub fn find(&self, name: &str, kinds: &[SymbolKind]) -> Option<&Symbol> {
        self.entries
            .iter()
            .find(|s| s.name == name && kinds.contains(&s.kind))
    }

    /// Adds `offset` to the value of every entry of the given kind.
    pub fn rebase(&mut self, kind: SymbolKind, offset: i32) {
        for symbol in &mut self.entries {
            if symbol.kind == kind {
                symbol.value += offset;
            }
        }
        self.entries.sort_by_key(|s| s.value);
    }

    pub fn of_kind(&self, kind: SymbolKind) -> impl Iterator<Item = &Symbol> {
        self.entries.iter().filter(move |s| s.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_keeps_value_order() {
        let mut table = SymbolTable::new();
        table.insert("MAIN", 105, SymbolKind::Code);
        table.insert("LOOP", 100, SymbolKind::Code);
        table.insert("K", 0, SymbolKind::External);
        let values: Vec<i32> = table.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![0, 100, 105]);
    }

    #[test]
    fn equal_values_keep_insertion_order() {
        let mut table = SymbolTable::new();
        table.insert("A", 101, SymbolKind::ExternalReference);
        table.insert("B", 101, SymbolKind::ExternalReference);
        let names: Vec<&str> = table.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn find_filters_by_kind() {
        let mut table = SymbolTable::new();
        table.insert("X", 7, SymbolKind::Data);
        table.insert("X", 7, SymbolKind::Entry);
        assert!(table.find("X", &[SymbolKind::Code]).is_none());
        assert_eq!(
            table.find("X", &[SymbolKind::Data, SymbolKind::Code]).map(|s| s.kind),
            Some(SymbolKind::Data)
        );
        assert!(table.find("Y", &[SymbolKind::Data]).is_none());
    }

    #[test]
    fn rebase_shifts_one_kind_and_restores_order() {
        let mut table = SymbolTable::new();
        table.insert("D", 0, SymbolKind::Data);
        table.insert("C", 100, SymbolKind::Code);
        table.rebase(SymbolKind::Data, 103);
        let pairs: Vec<(&str, i32)> = table.iter().map(|s| (s.name.as_str(), s.value)).collect();
        assert_eq!(pairs, vec![("C", 100), ("D", 103)]);
    }
}
