use crate::demo_model::{SyntheticModel, PALETTE};
use crate::Verbosity;
use faceballot::*;
use std::collections::BTreeMap;
use std::sync::Arc;

const ADMIN: u64 = 1;
const ELECTION: ElectionId = 2021;
const CANDIDATES: Choice = 3;

pub fn command_e2e(matches: &clap::ArgMatches, policy: &Policy, verbosity: Verbosity) {
    let voters = matches.value_of("voters").unwrap();
    let voters: u64 = match voters.parse() {
        Ok(n) if (2..=PALETTE.len() as u64).contains(&n) => n,
        _ => {
            eprintln!(
                "faceballot e2e: voters must be between 2 and {}",
                PALETTE.len()
            );
            std::process::exit(1);
        }
    };

    let model = SyntheticModel::new(policy);
    let store = Arc::new(MemStore::default());
    let audit = Arc::new(MemAuditLog::default());
    let booth = VotingBooth::new(
        FaceMatcher::new(model, model, policy.clone()),
        VoteCipher::new(),
        Collaborators::in_memory(store.clone(), audit.clone()),
    );

    let face = |voter: u64| PALETTE[(voter - 1) as usize];

    // Set up the election
    // -------------------
    booth.create_election(ADMIN, ELECTION).unwrap_or_else(|e| fail(e));
    println!("> Election {} created", ELECTION);

    for voter in 1..=voters {
        store.allow(voter, ELECTION);
        booth
            .register_voter(voter, &SyntheticModel::capture(face(voter), 0))
            .unwrap_or_else(|e| fail(e));
    }
    println!("> {} voters enrolled", voters);

    // Voter 2 tries to vote as voter 1
    match booth.cast_vote(1, ELECTION, &SyntheticModel::capture(face(2), 0), 1) {
        Err(Error::FaceVerificationFailed { score, .. }) => {
            println!("> Impostor rejected (similarity: {:.2})", score)
        }
        Ok(_) => fail("impostor vote was accepted"),
        Err(e) => fail(e),
    }

    // Everyone votes, under slightly different lighting than at enrollment
    // ---------------------------------------------------------------------
    let mut receipts = Vec::new();
    for voter in 1..=voters {
        let choice = (voter as Choice % CANDIDATES) + 1;
        let capture = SyntheticModel::capture(face(voter), 10);
        let receipt = booth
            .cast_vote(voter, ELECTION, &capture, choice)
            .unwrap_or_else(|e| fail(e));
        println!("> Voter {} cast vote {}", voter, receipt.vote_id);
        if verbosity >= Verbosity::Info {
            println!("  receipt: {}", receipt.integrity_hash);
        }
        receipts.push(receipt);
    }

    // Voter 1 tries again
    match booth.cast_vote(1, ELECTION, &SyntheticModel::capture(face(1), 0), 2) {
        Err(Error::NotEligible { .. }) | Err(Error::AlreadyVoted { .. }) => {
            println!("> Second vote refused")
        }
        Ok(_) => fail("second vote was accepted"),
        Err(e) => fail(e),
    }

    for receipt in &receipts {
        if !booth.verify_receipt(receipt.vote_id, &receipt.integrity_hash.to_string()) {
            fail::<()>(format!("receipt for vote {} did not verify", receipt.vote_id));
        }
    }
    println!("> Receipts verified OK");

    // Voting is over
    // --------------
    let mut tally: BTreeMap<Choice, u64> = BTreeMap::new();
    for (vote_id, _) in store.votes(ELECTION) {
        let choice = booth.open_vote(ADMIN, vote_id).unwrap_or_else(|e| fail(e));
        *tally.entry(choice).or_default() += 1;
    }

    println!("Tally:");
    for (candidate, num_votes) in tally.iter() {
        println!("  {} got {} votes", candidate, num_votes);
    }

    println!("Audit trail:");
    for event in audit.events() {
        println!(
            "  {} {} {} {}: {}",
            event.actor,
            event.user_id.unwrap_or_default(),
            event.action,
            event.outcome,
            event.detail
        );
    }
}

fn fail<T>(e: impl std::fmt::Display) -> T {
    eprintln!("faceballot e2e: {}", e);
    std::process::exit(1);
}
