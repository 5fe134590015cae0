use eventsx_api::password::{self, PasswordWeakness, validate_strength};

#[test]
fn test_reference_password_is_accepted() {
    assert_eq!(validate_strength(Some("Abcdef1!")), Ok(()));
}

#[test]
fn test_each_missing_criterion_is_reported() {
    let cases = [
        (None, PasswordWeakness::Missing),
        (Some(""), PasswordWeakness::Missing),
        (Some("Ab1!"), PasswordWeakness::TooShort),
        (Some("Abcde1!"), PasswordWeakness::TooShort),
        (Some("abcdef1!"), PasswordWeakness::NoUppercase),
        (Some("ABCDEF1!"), PasswordWeakness::NoLowercase),
        (Some("Abcdefg!"), PasswordWeakness::NoDigit),
        (Some("Abcdefg1"), PasswordWeakness::NoSpecialCharacter),
        // Underscore and hyphen are not in the special-character set.
        (Some("Abcdef1_-"), PasswordWeakness::NoSpecialCharacter),
    ];

    for (input, expected) in cases {
        assert_eq!(
            validate_strength(input),
            Err(expected),
            "unexpected outcome for {:?}",
            input
        );
    }
}

#[test]
fn test_every_special_character_counts() {
    for special in password::SPECIAL_CHARACTERS.chars() {
        let candidate = format!("Abcdef1{}", special);
        assert!(
            validate_strength(Some(&candidate)).is_ok(),
            "{:?} should be accepted",
            candidate
        );
    }
}

#[test]
fn test_weakness_messages_name_the_criterion() {
    assert!(PasswordWeakness::TooShort.message().contains("8 characters"));
    assert!(PasswordWeakness::NoUppercase.message().contains("uppercase"));
    assert!(PasswordWeakness::NoDigit.message().contains("number"));
}

#[test]
fn test_hash_is_salted_and_verifiable() {
    let first = password::hash("Abcdef1!").unwrap();
    let second = password::hash("Abcdef1!").unwrap();

    assert_ne!(first, second, "each hash must use a fresh salt");
    assert_ne!(first, "Abcdef1!");
    assert!(password::verify("Abcdef1!", &first));
    assert!(password::verify("Abcdef1!", &second));
}

#[test]
fn test_wrong_password_or_corrupt_digest_is_false_not_error() {
    let digest = password::hash("Abcdef1!").unwrap();

    assert!(!password::verify("Abcdef1?", &digest));
    assert!(!password::verify("Abcdef1!", "not-a-phc-string"));
    assert!(!password::verify("Abcdef1!", ""));
}
