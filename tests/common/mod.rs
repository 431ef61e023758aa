//! Common test helpers and utilities shared across test suite.

#![allow(dead_code)]

use unicat::marcxml::records_to_marcxml;
use unicat::{Field, Leader, MarcWriter, Record, RunConfig, RunOptions, SourceInput};

/// Creates a default leader for test records.
pub fn create_test_leader() -> Leader {
    Leader {
        record_length: 0,
        record_status: 'n',
        record_type: 'a',
        bibliographic_level: 'm',
        control_record_type: ' ',
        character_coding: 'a',
        indicator_count: 2,
        subfield_code_count: 2,
        data_base_address: 0,
        encoding_level: ' ',
        cataloging_form: 'a',
        multipart_level: ' ',
        reserved: "4500".to_string(),
    }
}

/// Builder-style description of a test book.
#[derive(Debug, Clone, Default)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub year: Option<u16>,
    pub isbn: Option<String>,
    pub issn: Option<String>,
    pub local: Vec<(String, String)>,
}

impl Book {
    pub fn new(id: &str, title: &str) -> Self {
        Book {
            id: id.to_string(),
            title: title.to_string(),
            ..Book::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    pub fn year(mut self, year: u16) -> Self {
        self.year = Some(year);
        self
    }

    pub fn isbn(mut self, isbn: &str) -> Self {
        self.isbn = Some(isbn.to_string());
        self
    }

    pub fn issn(mut self, issn: &str) -> Self {
        self.issn = Some(issn.to_string());
        self
    }

    /// Adds a local-use field `tag $a value`.
    pub fn local(mut self, tag: &str, value: &str) -> Self {
        self.local.push((tag.to_string(), value.to_string()));
        self
    }

    pub fn record(&self) -> Record {
        let mut record = Record::new(create_test_leader());
        record.add_control_field_str("001", &self.id);

        if let Some(isbn) = &self.isbn {
            let mut field = Field::new("020".to_string(), ' ', ' ');
            field.add_subfield_str('a', isbn);
            record.add_field(field);
        }
        if let Some(issn) = &self.issn {
            let mut field = Field::new("022".to_string(), ' ', ' ');
            field.add_subfield_str('a', issn);
            record.add_field(field);
        }
        if let Some(author) = &self.author {
            let mut field = Field::new("100".to_string(), '1', ' ');
            field.add_subfield_str('a', author);
            record.add_field(field);
        }

        let mut field_245 = Field::new("245".to_string(), '1', '0');
        field_245.add_subfield_str('a', &self.title);
        record.add_field(field_245);

        if let Some(year) = self.year {
            let mut field = Field::new("264".to_string(), ' ', '1');
            field.add_subfield_str('c', &year.to_string());
            record.add_field(field);
        }

        for (tag, value) in &self.local {
            let mut field = Field::new(tag.clone(), ' ', ' ');
            field.add_subfield_str('a', value);
            record.add_field(field);
        }

        record
    }
}

/// ISO 2709 bytes of `records`.
pub fn iso2709_bytes(records: &[Record]) -> Vec<u8> {
    let mut buffer = Vec::new();
    {
        let mut writer = MarcWriter::new(&mut buffer);
        for record in records {
            writer.write_record(record).expect("encode test record");
        }
        writer.finish().expect("flush test records");
    }
    buffer
}

/// An in-memory ISO 2709 source.
pub fn iso_source(label: &str, books: &[Book]) -> SourceInput {
    let records: Vec<Record> = books.iter().map(Book::record).collect();
    SourceInput::from_bytes(label, iso2709_bytes(&records))
}

/// An in-memory MARCXML source.
pub fn xml_source(label: &str, books: &[Book]) -> SourceInput {
    let records: Vec<Record> = books.iter().map(Book::record).collect();
    SourceInput::from_bytes(label, records_to_marcxml(&records).expect("encode test xml"))
}

/// Validated configuration from TOML options.
pub fn config(toml: &str) -> RunConfig {
    RunOptions::from_toml_str(toml)
        .and_then(|options| options.validate())
        .expect("valid test options")
}
