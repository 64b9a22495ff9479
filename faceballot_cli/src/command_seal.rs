use faceballot::*;

pub fn command_seal(matches: &clap::ArgMatches) {
    let choice = matches.value_of("CHOICE").unwrap();
    let choice: Choice = choice.parse().unwrap_or_else(|_| {
        eprintln!("faceballot seal: invalid choice {}", choice);
        std::process::exit(1);
    });

    let key_file = matches.value_of("public-key").unwrap();
    let pem = String::from_utf8_lossy(&crate::read_file("seal", key_file)).into_owned();
    let key = ElectionPublicKey::from_pem(&pem).unwrap_or_else(|e| {
        eprintln!("faceballot seal: {}: {}", key_file, e);
        std::process::exit(1);
    });

    let sealed = VoteCipher::new().seal(choice, &key).unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });

    println!("{}", serde_json::to_string_pretty(&sealed).unwrap());
}

pub fn command_open(matches: &clap::ArgMatches) {
    let sealed = read_sealed("open", matches.value_of("SEALED").unwrap());

    let key_file = matches.value_of("private-key").unwrap();
    let pem = String::from_utf8_lossy(&crate::read_file("open", key_file)).into_owned();
    let key = ElectionPrivateKey::from_pem(&pem).unwrap_or_else(|e| {
        eprintln!("faceballot open: {}: {}", key_file, e);
        std::process::exit(1);
    });

    match VoteCipher::new().open(&sealed, &key) {
        Ok(choice) => println!("{}", choice),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

pub fn command_verify(matches: &clap::ArgMatches) {
    // Loading checks the stored hash against the ciphertext
    let sealed = read_sealed("verify", matches.value_of("SEALED").unwrap());
    println!("integrity-hash: {}", sealed.integrity_hash());

    if let Some(receipt) = matches.value_of("HASH") {
        if sealed.matches_receipt(receipt) {
            println!("> Receipt verified OK");
        } else {
            eprintln!("faceballot verify: receipt does not match");
            std::process::exit(1);
        }
    }
}

fn read_sealed(command: &str, filename: &str) -> SealedVote {
    let bytes = crate::read_file(command, filename);
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        eprintln!("faceballot {}: unable to read {}: {}", command, filename, e);
        std::process::exit(1);
    })
}
