use faceballot::VoteCipher;
use std::path::PathBuf;

pub fn command_keygen(matches: &clap::ArgMatches) {
    let keys = VoteCipher::new().generate_key_pair().unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });

    let (public, secret) = keys.to_pem().unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });

    match matches.value_of("out") {
        Some(dir) => {
            let dir = PathBuf::from(crate::expand(dir));
            let public_path = dir.join("public.pem");
            let secret_path = dir.join("private.pem");
            crate::write_file("keygen", &public_path.to_string_lossy(), public.as_bytes());
            crate::write_file("keygen", &secret_path.to_string_lossy(), secret.as_bytes());
            log::info!(
                "wrote {} and {}",
                public_path.display(),
                secret_path.display()
            );
        }
        None => {
            println!("{}", public);
            println!("{}", secret);
        }
    }
}
