//! Built-in JSON Schemas for ZBRS documents.
//!
//! The schemas check shape, types, required fields and string patterns only.
//! Cross-field rules (counts, duplicates, numbering) live in the validator so
//! they can report specific codes.

use serde_json::{json, Value};

const CHECKSUM_PATTERN: &str = "^sha256:[a-f0-9]{64}$";
const VERSION_PATTERN: &str = "^[0-9]+\\.[0-9]+\\.[0-9]+$";
const ZBRS_VERSION_PATTERN: &str = "^1\\.[0-9]+$";

fn technical() -> Value {
    json!({
        "type": "object",
        "required": ["encoding"],
        "properties": {
            "encoding": { "type": "string", "const": "UTF-8" },
            "compression": { "type": ["string", "null"] },
            "checksum": { "type": ["string", "null"], "pattern": CHECKSUM_PATTERN },
            "size": { "type": ["integer", "null"], "minimum": 0 }
        }
    })
}

pub(crate) fn parent_manifest_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["zbrs_version", "repository", "publisher", "translations", "technical"],
        "properties": {
            "zbrs_version": { "type": "string", "pattern": ZBRS_VERSION_PATTERN },
            "repository": {
                "type": "object",
                "required": ["id", "name", "version", "type"],
                "properties": {
                    "id": { "type": "string", "minLength": 1 },
                    "name": { "type": "string", "minLength": 1 },
                    "description": { "type": ["string", "null"] },
                    "version": { "type": "string", "pattern": VERSION_PATTERN },
                    "created_at": { "type": ["string", "null"] },
                    "updated_at": { "type": ["string", "null"] },
                    "type": { "type": "string" }
                }
            },
            "publisher": {
                "type": ["object", "null"],
                "required": ["name"],
                "properties": {
                    "name": { "type": "string", "minLength": 1 },
                    "url": { "type": ["string", "null"] },
                    "contact": { "type": ["string", "null"] }
                }
            },
            "translations": {
                "type": "array",
                "items": { "$ref": "#/$defs/translationReference" }
            },
            "technical": technical(),
            "extensions": { "type": ["object", "null"] }
        },
        "$defs": {
            "translationReference": {
                "type": "object",
                "required": ["id", "name", "directory", "language", "status"],
                "properties": {
                    "id": { "type": "string", "minLength": 1 },
                    "name": { "type": "string", "minLength": 1 },
                    "directory": { "type": "string", "minLength": 1 },
                    "language": { "type": "string", "minLength": 1 },
                    "status": { "type": "string", "enum": ["active", "inactive", "deprecated"] },
                    "checksum": { "type": ["string", "null"], "pattern": CHECKSUM_PATTERN }
                }
            }
        }
    })
}

pub(crate) fn translation_manifest_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["zbrs_version", "repository", "technical"],
        "properties": {
            "zbrs_version": { "type": "string", "pattern": ZBRS_VERSION_PATTERN },
            "repository": {
                "type": "object",
                "required": ["id", "name", "version"],
                "properties": {
                    "id": { "type": "string", "minLength": 1 },
                    "name": { "type": "string", "minLength": 1 },
                    "description": { "type": ["string", "null"] },
                    "version": { "type": "string", "pattern": VERSION_PATTERN },
                    "created_at": { "type": ["string", "null"] },
                    "updated_at": { "type": ["string", "null"] },
                    "language": {
                        "type": "object",
                        "required": ["code", "name"],
                        "properties": {
                            "code": { "type": "string", "minLength": 2 },
                            "name": { "type": "string", "minLength": 1 },
                            "direction": { "type": "string", "enum": ["ltr", "rtl"] }
                        }
                    },
                    "translation": {
                        "type": "object",
                        "required": ["type"],
                        "properties": {
                            "type": { "type": "string", "minLength": 1 },
                            "year": { "type": ["integer", "null"], "minimum": 0, "maximum": 65535 },
                            "copyright": { "type": ["string", "null"] },
                            "license": { "type": ["string", "null"] },
                            "source": { "type": ["string", "null"] }
                        }
                    }
                }
            },
            "content": {
                "type": "object",
                "required": ["books_count", "testament"],
                "properties": {
                    "books_count": { "type": "integer", "minimum": 0 },
                    "testament": {
                        "type": "object",
                        "required": ["old", "new"],
                        "properties": {
                            "old": { "type": "integer", "minimum": 0 },
                            "new": { "type": "integer", "minimum": 0 }
                        }
                    },
                    "features": { "type": "object" },
                    "books": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["path"],
                            "properties": {
                                "path": { "type": "string", "minLength": 1 },
                                "checksum": { "type": ["string", "null"] },
                                "size": { "type": ["integer", "null"], "minimum": 0 },
                                "media_type": { "type": ["string", "null"] }
                            }
                        }
                    }
                }
            },
            "technical": technical(),
            "extensions": { "type": ["object", "null"] }
        }
    })
}

pub(crate) fn book_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["book", "chapters"],
        "properties": {
            "book": {
                "type": "object",
                "required": ["id", "name", "order", "testament", "chapters_count", "verses_count"],
                "properties": {
                    "id": { "type": "string", "minLength": 1 },
                    "name": { "type": "string", "minLength": 1 },
                    "abbreviation": { "type": ["string", "null"] },
                    "order": { "type": "integer", "minimum": 1 },
                    "testament": { "type": "string", "enum": ["old", "new"] },
                    "chapters_count": { "type": "integer", "minimum": 0 },
                    "verses_count": { "type": "integer", "minimum": 0 }
                }
            },
            "chapters": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["number", "verses"],
                    "properties": {
                        "number": { "type": "integer", "minimum": 0 },
                        "verses": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["number", "text"],
                                "properties": {
                                    "number": { "type": "integer", "minimum": 0 },
                                    "text": { "type": "string" },
                                    "footnotes": { "type": "array" },
                                    "cross_references": { "type": "array" },
                                    "study_notes": { "type": "array" }
                                }
                            }
                        }
                    }
                }
            },
            "metadata": { "type": ["object", "null"] }
        }
    })
}
