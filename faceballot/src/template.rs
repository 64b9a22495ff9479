use crate::*;
use std::convert::TryFrom;

/// Current template wire format
pub const TEMPLATE_FORMAT: u8 = 1;

/// A fixed-length face embedding produced by the identity encoder
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Embedding(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.0
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Embedding(values)
    }
}

/// A voter's enrolled face, tagged with the policy version that produced it.
///
/// Serialized as a self-describing record so that templates written under one
/// policy are never read back as if they were written under another:
///
/// ```text
/// { format: 1, policy_version: u16, dims: u32, values: [f32; dims] }
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(into = "TemplateRecord", try_from = "TemplateRecord")]
pub struct EnrollmentTemplate {
    embedding: Embedding,
    policy_version: u16,
}

impl EnrollmentTemplate {
    pub fn new(embedding: Embedding, policy_version: u16) -> Self {
        EnrollmentTemplate {
            embedding,
            policy_version,
        }
    }

    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }

    pub fn policy_version(&self) -> u16 {
        self.policy_version
    }

    /// Pack into CBOR
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_cbor::to_vec(self)?)
    }

    /// Unpack from CBOR, refusing formats this build does not understand
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        // Look at the format tag alone first so a future layout fails cleanly
        let probe: FormatProbe = serde_cbor::from_slice(bytes)?;
        if probe.format != TEMPLATE_FORMAT {
            return Err(Error::UnsupportedTemplateFormat(probe.format));
        }

        let record: TemplateRecord = serde_cbor::from_slice(bytes)?;
        EnrollmentTemplate::try_from(record)
    }
}

#[derive(Deserialize)]
struct FormatProbe {
    format: u8,
}

#[derive(Serialize, Deserialize, Clone)]
struct TemplateRecord {
    format: u8,
    policy_version: u16,
    dims: u32,
    values: Vec<f32>,
}

impl From<EnrollmentTemplate> for TemplateRecord {
    fn from(template: EnrollmentTemplate) -> Self {
        let values = template.embedding.into_vec();
        TemplateRecord {
            format: TEMPLATE_FORMAT,
            policy_version: template.policy_version,
            dims: values.len() as u32,
            values,
        }
    }
}

impl TryFrom<TemplateRecord> for EnrollmentTemplate {
    type Error = Error;

    fn try_from(record: TemplateRecord) -> Result<Self, Self::Error> {
        if record.format != TEMPLATE_FORMAT {
            return Err(Error::UnsupportedTemplateFormat(record.format));
        }
        if record.dims as usize != record.values.len() {
            return Err(Error::TemplateDimensionMismatch {
                declared: record.dims,
                actual: record.values.len(),
            });
        }

        Ok(EnrollmentTemplate {
            embedding: Embedding(record.values),
            policy_version: record.policy_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_bytes() {
        let template = EnrollmentTemplate::new(vec![0.25, -1.5, 3.0].into(), 7);
        let bytes = template.to_bytes().unwrap();
        let decoded = EnrollmentTemplate::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, template);
        assert_eq!(decoded.policy_version(), 7);

        // JSON goes through the same record
        let json = serde_json::to_value(&template).unwrap();
        assert_eq!(json["format"], 1);
        assert_eq!(json["dims"], 3);
    }

    #[test]
    fn rejects_unknown_format() {
        let record = TemplateRecord {
            format: 9,
            policy_version: 1,
            dims: 1,
            values: vec![1.0],
        };
        let bytes = serde_cbor::to_vec(&record).unwrap();
        match EnrollmentTemplate::from_bytes(&bytes) {
            Err(Error::UnsupportedTemplateFormat(9)) => {}
            other => panic!("unexpected result: {:?}", other),
        }

        // A future format with a different layout still reports the format
        let bytes = serde_cbor::to_vec(&serde_json::json!({ "format": 2, "payload": "zz" })).unwrap();
        assert!(matches!(
            EnrollmentTemplate::from_bytes(&bytes),
            Err(Error::UnsupportedTemplateFormat(2))
        ));
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let record = TemplateRecord {
            format: TEMPLATE_FORMAT,
            policy_version: 1,
            dims: 4,
            values: vec![1.0, 2.0],
        };
        let bytes = serde_cbor::to_vec(&record).unwrap();
        assert!(matches!(
            EnrollmentTemplate::from_bytes(&bytes),
            Err(Error::TemplateDimensionMismatch {
                declared: 4,
                actual: 2
            })
        ));

        assert!(EnrollmentTemplate::from_bytes(b"not cbor at all").is_err());
    }
}
