use crate::demo_model::SyntheticModel;
use faceballot::*;

pub fn command_enroll(matches: &clap::ArgMatches, policy: &Policy) {
    let embedding = read_embedding("enroll", matches.value_of("EMBEDDING").unwrap());

    let dims = policy.encoder.embedding_dims;
    if embedding.len() != dims {
        eprintln!(
            "faceballot enroll: embedding has {} dimensions, policy expects {}",
            embedding.len(),
            dims
        );
        std::process::exit(1);
    }

    let template = EnrollmentTemplate::new(embedding, policy.version);
    let bytes = template.to_bytes().unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });

    crate::write_file("enroll", matches.value_of("out").unwrap(), &bytes);
}

pub fn command_match(matches: &clap::ArgMatches, policy: &Policy) {
    let template = read_template(matches.value_of("TEMPLATE").unwrap());
    let embedding = read_embedding("match", matches.value_of("EMBEDDING").unwrap());

    // Only verify() is used, so the model is never consulted
    let model = SyntheticModel::new(policy);
    let matcher = FaceMatcher::new(model, model, policy.clone());

    let decision = matcher.verify(&embedding, &template);
    println!("{}", serde_json::to_string_pretty(&decision).unwrap());

    if !decision.is_match {
        std::process::exit(1);
    }
}

fn read_embedding(command: &str, filename: &str) -> Embedding {
    let bytes = crate::read_file(command, filename);
    let values: Vec<f32> = serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        eprintln!("faceballot {}: unable to read {}: {}", command, filename, e);
        std::process::exit(1);
    });

    if values.iter().any(|v| !v.is_finite()) {
        eprintln!("faceballot {}: {} contains non-finite values", command, filename);
        std::process::exit(1);
    }

    values.into()
}

fn read_template(filename: &str) -> EnrollmentTemplate {
    use content_inspector::ContentType;

    let bytes = crate::read_file("match", filename);

    let template = match content_inspector::inspect(&bytes) {
        ContentType::UTF_8 => serde_json::from_slice(&bytes).map_err(Error::from),
        ContentType::BINARY => EnrollmentTemplate::from_bytes(&bytes),
        _ => {
            eprintln!("faceballot match: invalid file format for {}", filename);
            std::process::exit(1);
        }
    };

    template.unwrap_or_else(|e| {
        eprintln!("faceballot match: unable to read {}: {}", filename, e);
        std::process::exit(1);
    })
}
