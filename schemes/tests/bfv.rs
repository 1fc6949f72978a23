use schemes::error::Error;
use schemes::{
    modulus_chain, BatchEncoder, Ciphertext, Context, Decryptor, EncryptionParameters, Encryptor,
    Evaluator, KeyGenerator, SchemeType,
};

use std::sync::Arc;

fn bfv_context(degree: usize, plain_modulus: u64) -> Arc<Context> {
    let params = EncryptionParameters {
        scheme: SchemeType::Bfv,
        poly_modulus_degree: degree,
        coeff_modulus: modulus_chain::bfv_default(degree).unwrap(),
        plain_modulus,
    };
    Arc::new(Context::new(&params).unwrap())
}

fn sub_test<F: FnOnce()>(name: &str, f: F) {
    println!("Running {}", name);
    f();
}

#[test]
fn bfv_encrypt_add_plain_decrypt() {
    let ctx: Arc<Context> = bfv_context(4096, 1032193);
    let mut keygen: KeyGenerator = KeyGenerator::new(&ctx);
    let pk = keygen.create_public_key();
    let encoder: BatchEncoder = BatchEncoder::new(&ctx).unwrap();
    let mut encryptor: Encryptor = Encryptor::new(&ctx, &pk).unwrap();
    let decryptor: Decryptor = Decryptor::new(&ctx, keygen.secret_key()).unwrap();
    let evaluator: Evaluator = Evaluator::new(&ctx);

    let ct: Ciphertext = encryptor.encrypt(&encoder.encode(&[123]).unwrap()).unwrap();
    let sum: Ciphertext = evaluator
        .add_plain(&ct, &encoder.encode(&[456]).unwrap())
        .unwrap();
    let decoded: Vec<u64> = encoder.decode(&decryptor.decrypt(&sum).unwrap()).unwrap();
    assert_eq!(decoded[0], 579);
    assert!(decoded[1..].iter().all(|&v| v == 0));
}

#[test]
fn bfv_evaluator() {
    let t: u64 = 40961;
    let ctx: Arc<Context> = bfv_context(4096, t);
    let mut keygen: KeyGenerator = KeyGenerator::new(&ctx);
    let pk = keygen.create_public_key();
    let rk = keygen.create_relin_keys().unwrap();
    let gk = keygen.create_galois_keys().unwrap();
    let encoder: BatchEncoder = BatchEncoder::new(&ctx).unwrap();
    let mut encryptor: Encryptor = Encryptor::new(&ctx, &pk).unwrap();
    let decryptor: Decryptor = Decryptor::new(&ctx, keygen.secret_key()).unwrap();
    let evaluator: Evaluator = Evaluator::new(&ctx);

    let n: usize = encoder.slot_count();
    let a_vals: Vec<u64> = (0..n as u64).map(|i| (i * 17 + 3) % t).collect();
    let b_vals: Vec<u64> = (0..n as u64).map(|i| (i * 31 + 11) % t).collect();

    sub_test("test_batch_roundtrip", || {
        let pt = encoder.encode(&a_vals).unwrap();
        assert_eq!(encoder.decode(&pt).unwrap(), a_vals);

        let signed: Vec<i64> = vec![-5, -1, 0, 1, 5, -20000, 20000];
        let pt = encoder.encode_signed(&signed).unwrap();
        assert_eq!(encoder.decode_signed(&pt).unwrap()[..7], signed);
    });

    sub_test("test_encoder_capacity", || {
        assert!(matches!(
            encoder.encode(&vec![0u64; n + 1]),
            Err(Error::CapacityExceeded { .. })
        ));
        assert!(matches!(
            encoder.encode(&[t]),
            Err(Error::CapacityExceeded { .. })
        ));
        assert!(matches!(
            encoder.encode_signed(&[(t / 2 + 1) as i64]),
            Err(Error::CapacityExceeded { .. })
        ));
    });

    sub_test("test_add_sub_negate", || {
        let a = encryptor.encrypt(&encoder.encode(&a_vals).unwrap()).unwrap();
        let b = encryptor.encrypt(&encoder.encode(&b_vals).unwrap()).unwrap();

        let decoded: Vec<u64> = encoder
            .decode(&decryptor.decrypt(&evaluator.add(&a, &b).unwrap()).unwrap())
            .unwrap();
        for (i, &v) in decoded.iter().enumerate() {
            assert_eq!(v, (a_vals[i] + b_vals[i]) % t);
        }

        let decoded: Vec<u64> = encoder
            .decode(&decryptor.decrypt(&evaluator.sub(&a, &b).unwrap()).unwrap())
            .unwrap();
        for (i, &v) in decoded.iter().enumerate() {
            assert_eq!(v, (a_vals[i] + t - b_vals[i]) % t);
        }

        let decoded: Vec<u64> = encoder
            .decode(&decryptor.decrypt(&evaluator.negate(&a).unwrap()).unwrap())
            .unwrap();
        for (i, &v) in decoded.iter().enumerate() {
            assert_eq!(v, (t - a_vals[i]) % t);
        }
    });

    sub_test("test_multiply_relinearize", || {
        let a = encryptor.encrypt(&encoder.encode(&a_vals).unwrap()).unwrap();
        let b = encryptor.encrypt(&encoder.encode(&b_vals).unwrap()).unwrap();

        let prod: Ciphertext = evaluator.multiply(&a, &b).unwrap();
        assert_eq!(prod.size(), 3);
        assert_eq!(prod.level(), a.level());

        let prod: Ciphertext = evaluator.relinearize(&prod, &rk).unwrap();
        assert_eq!(prod.size(), 2);

        let decoded: Vec<u64> = encoder.decode(&decryptor.decrypt(&prod).unwrap()).unwrap();
        for (i, &v) in decoded.iter().enumerate() {
            assert_eq!(v, a_vals[i] * b_vals[i] % t);
        }
    });

    sub_test("test_multiply_plain_and_square", || {
        let a = encryptor.encrypt(&encoder.encode(&a_vals).unwrap()).unwrap();
        let decoded: Vec<u64> = encoder
            .decode(
                &decryptor
                    .decrypt(
                        &evaluator
                            .multiply_plain(&a, &encoder.encode(&b_vals).unwrap())
                            .unwrap(),
                    )
                    .unwrap(),
            )
            .unwrap();
        for (i, &v) in decoded.iter().enumerate() {
            assert_eq!(v, a_vals[i] * b_vals[i] % t);
        }

        let sq: Ciphertext = evaluator
            .relinearize(&evaluator.square(&a).unwrap(), &rk)
            .unwrap();
        let decoded: Vec<u64> = encoder.decode(&decryptor.decrypt(&sq).unwrap()).unwrap();
        for (i, &v) in decoded.iter().enumerate() {
            assert_eq!(v, a_vals[i] * a_vals[i] % t);
        }
    });

    sub_test("test_add_many", || {
        let cts: Vec<Ciphertext> = [1u64, 2, 3]
            .iter()
            .map(|&v| encryptor.encrypt(&encoder.encode(&[v]).unwrap()).unwrap())
            .collect();
        let sum: Ciphertext = evaluator.add_many(&cts).unwrap();
        let decoded: Vec<u64> = encoder.decode(&decryptor.decrypt(&sum).unwrap()).unwrap();
        assert_eq!(decoded[0], 6);
        assert!(matches!(
            evaluator.add_many(&[]),
            Err(Error::InvalidParameters(_))
        ));
    });

    sub_test("test_rotate_rows_and_columns", || {
        let row: usize = n / 2;
        let values: Vec<u64> = (1..=8).collect();
        let ct = encryptor.encrypt(&encoder.encode(&values).unwrap()).unwrap();

        let decoded: Vec<u64> = encoder
            .decode(&decryptor.decrypt(&evaluator.rotate_rows(&ct, 2, &gk).unwrap()).unwrap())
            .unwrap();
        assert_eq!(decoded[..6], [3, 4, 5, 6, 7, 8]);
        assert_eq!(decoded[row - 2], 1);
        assert_eq!(decoded[row - 1], 2);

        let decoded: Vec<u64> = encoder
            .decode(&decryptor.decrypt(&evaluator.rotate_rows(&ct, -1, &gk).unwrap()).unwrap())
            .unwrap();
        assert_eq!(decoded[0], 0);
        assert_eq!(decoded[1..9], [1, 2, 3, 4, 5, 6, 7, 8]);

        let decoded: Vec<u64> = encoder
            .decode(&decryptor.decrypt(&evaluator.rotate_columns(&ct, &gk).unwrap()).unwrap())
            .unwrap();
        assert!(decoded[..8].iter().all(|&v| v == 0));
        assert_eq!(decoded[row..row + 8], [1, 2, 3, 4, 5, 6, 7, 8]);
    });

    sub_test("test_canonical_form_invariant", || {
        let a = encryptor.encrypt(&encoder.encode(&a_vals).unwrap()).unwrap();
        let prod: Ciphertext = evaluator.multiply(&a, &a).unwrap();
        assert!(!prod.is_canonical());

        assert!(matches!(
            evaluator.rotate_rows(&prod, 1, &gk),
            Err(Error::SizeMismatch { given: 3, required: 2 })
        ));
        assert!(matches!(
            evaluator.multiply(&prod, &a),
            Err(Error::SizeMismatch { given: 3, required: 2 })
        ));
        assert!(matches!(
            evaluator.square(&prod),
            Err(Error::SizeMismatch { given: 3, required: 2 })
        ));
        assert!(matches!(
            evaluator.relinearize(&a, &rk),
            Err(Error::SizeMismatch { given: 2, required: 3 })
        ));
    });

    sub_test("test_mod_switch", || {
        let a = encryptor.encrypt(&encoder.encode(&a_vals).unwrap()).unwrap();
        let switched: Ciphertext = evaluator.mod_switch_to_next(&a).unwrap();
        assert_eq!(switched.level(), a.level() + 1);
        assert_eq!(encoder.decode(&decryptor.decrypt(&switched).unwrap()).unwrap(), a_vals);

        assert!(matches!(
            evaluator.add(&a, &switched),
            Err(Error::LevelMismatch { lhs: 0, rhs: 1 })
        ));
        assert!(matches!(
            evaluator.mod_switch_to_next(&switched),
            Err(Error::ChainExhausted)
        ));
        let mut back = switched.clone();
        assert!(matches!(
            evaluator.mod_switch_to_inplace(&mut back, 0),
            Err(Error::InvalidParameters(_))
        ));
        assert!(matches!(
            evaluator.rescale_to_next(&a),
            Err(Error::InvalidParameters(_))
        ));
    });

    sub_test("test_encrypt_at_level", || {
        let ct = encryptor
            .encrypt_at_level(&encoder.encode(&a_vals).unwrap(), 1)
            .unwrap();
        assert_eq!(ct.level(), 1);
        assert!(decryptor.invariant_noise_budget(&ct).unwrap() > 0);
        assert_eq!(encoder.decode(&decryptor.decrypt(&ct).unwrap()).unwrap(), a_vals);
    });

    sub_test("test_noise_budget_exhaustion", || {
        let mut ct = encryptor.encrypt(&encoder.encode(&[3]).unwrap()).unwrap();
        let mut expected: u64 = 3;
        let mut budget: u32 = decryptor.invariant_noise_budget(&ct).unwrap();
        assert!(budget > 0);

        // Squaring burns roughly a fixed number of bits per step; the
        // budget must decrease strictly until it bottoms out at zero,
        // after which decryption silently yields garbage.
        for _ in 0..8 {
            evaluator.square_inplace(&mut ct).unwrap();
            evaluator.relinearize_inplace(&mut ct, &rk).unwrap();
            expected = expected * expected % t;
            let next: u32 = decryptor.invariant_noise_budget(&ct).unwrap();
            assert!(next < budget || (next == 0 && budget == 0));
            budget = next;
            if budget == 0 {
                break;
            }
        }
        assert_eq!(budget, 0);
        let mut expected_vals: Vec<u64> = vec![0u64; encoder.slot_count()];
        expected_vals[0] = expected;
        let decoded: Vec<u64> = encoder.decode(&decryptor.decrypt(&ct).unwrap()).unwrap();
        assert_ne!(decoded, expected_vals);
    });

    sub_test("test_key_isolation", || {
        let ct = encryptor.encrypt(&encoder.encode(&a_vals).unwrap()).unwrap();

        // A fresh secret key under the same context decrypts to noise.
        let other: KeyGenerator = KeyGenerator::new(&ctx);
        let wrong: Decryptor = Decryptor::new(&ctx, other.secret_key()).unwrap();
        let decoded: Vec<u64> = encoder.decode(&wrong.decrypt(&ct).unwrap()).unwrap();
        assert_ne!(decoded, a_vals);

        // Key material from another parameter set is rejected outright.
        let ctx2: Arc<Context> = bfv_context(4096, 65537);
        let mut keygen2: KeyGenerator = KeyGenerator::new(&ctx2);
        let pk2 = keygen2.create_public_key();
        let rk2 = keygen2.create_relin_keys().unwrap();
        let gk2 = keygen2.create_galois_keys().unwrap();

        assert!(matches!(
            Encryptor::new(&ctx, &pk2),
            Err(Error::KeyMismatch)
        ));
        assert!(matches!(
            Decryptor::new(&ctx, keygen2.secret_key()),
            Err(Error::KeyMismatch)
        ));
        let prod: Ciphertext = evaluator.multiply(&ct, &ct).unwrap();
        assert!(matches!(
            evaluator.relinearize(&prod, &rk2),
            Err(Error::MissingOrMismatchedKey(_))
        ));
        assert!(matches!(
            evaluator.rotate_rows(&ct, 1, &gk2),
            Err(Error::MissingOrMismatchedKey(_))
        ));
    });

    sub_test("test_missing_rotation_key", || {
        let mut keygen2: KeyGenerator =
            KeyGenerator::with_secret_key(&ctx, keygen.secret_key().clone()).unwrap();
        let gk1 = keygen2.create_galois_keys_for_steps(&[1]).unwrap();
        let ct = encryptor.encrypt(&encoder.encode(&a_vals).unwrap()).unwrap();

        assert!(evaluator.rotate_rows(&ct, 1, &gk1).is_ok());
        // Step 3 decomposes into the 1- and 2-hops; the 2-hop is absent.
        assert!(matches!(
            evaluator.rotate_rows(&ct, 3, &gk1),
            Err(Error::MissingOrMismatchedKey(_))
        ));
        assert!(matches!(
            keygen2.create_galois_keys_for_steps(&[0]),
            Err(Error::InvalidParameters(_))
        ));
    });
}

#[test]
fn bfv_deep_circuits() {
    let t: u64 = 65537;
    let ctx: Arc<Context> = bfv_context(8192, t);
    let mut keygen: KeyGenerator = KeyGenerator::new(&ctx);
    let pk = keygen.create_public_key();
    let rk = keygen.create_relin_keys().unwrap();
    let encoder: BatchEncoder = BatchEncoder::new(&ctx).unwrap();
    let mut encryptor: Encryptor = Encryptor::new(&ctx, &pk).unwrap();
    let decryptor: Decryptor = Decryptor::new(&ctx, keygen.secret_key()).unwrap();
    let evaluator: Evaluator = Evaluator::new(&ctx);

    sub_test("test_multiply_many", || {
        let cts: Vec<Ciphertext> = [2u64, 3, 4]
            .iter()
            .map(|&v| encryptor.encrypt(&encoder.encode(&[v]).unwrap()).unwrap())
            .collect();
        let prod: Ciphertext = evaluator.multiply_many(&cts, &rk).unwrap();
        assert_eq!(prod.size(), 2);
        let decoded: Vec<u64> = encoder.decode(&decryptor.decrypt(&prod).unwrap()).unwrap();
        assert_eq!(decoded[0], 24);
    });

    sub_test("test_exponentiate", || {
        let ct = encryptor.encrypt(&encoder.encode(&[3]).unwrap()).unwrap();
        let cubed: Ciphertext = evaluator.exponentiate(&ct, 3, &rk).unwrap();
        let decoded: Vec<u64> = encoder.decode(&decryptor.decrypt(&cubed).unwrap()).unwrap();
        assert_eq!(decoded[0], 27);

        assert!(matches!(
            evaluator.exponentiate(&ct, 0, &rk),
            Err(Error::InvalidParameters(_))
        ));
    });
}

#[test]
fn bfv_single_modulus_has_no_keyswitching() {
    let params = EncryptionParameters {
        scheme: SchemeType::Bfv,
        poly_modulus_degree: 4096,
        coeff_modulus: modulus_chain::create(4096, &[54]).unwrap(),
        plain_modulus: 40961,
    };
    let ctx: Arc<Context> = Arc::new(Context::new(&params).unwrap());
    assert!(!ctx.using_keyswitching());
    assert_eq!(ctx.max_level(), 0);

    let mut keygen: KeyGenerator = KeyGenerator::new(&ctx);
    assert!(matches!(
        keygen.create_relin_keys(),
        Err(Error::InvalidParameters(_))
    ));
    assert!(matches!(
        keygen.create_galois_keys(),
        Err(Error::InvalidParameters(_))
    ));

    // Encryption and decryption do not involve key switching and keep
    // working on the single-modulus chain.
    let pk = keygen.create_public_key();
    let encoder: BatchEncoder = BatchEncoder::new(&ctx).unwrap();
    let mut encryptor: Encryptor = Encryptor::new(&ctx, &pk).unwrap();
    let decryptor: Decryptor = Decryptor::new(&ctx, keygen.secret_key()).unwrap();
    let ct: Ciphertext = encryptor.encrypt(&encoder.encode(&[7]).unwrap()).unwrap();
    assert_eq!(encoder.decode(&decryptor.decrypt(&ct).unwrap()).unwrap()[0], 7);
}

#[test]
fn bfv_rejects_non_batching_plain_modulus() {
    // 12289 is prime but not congruent to 1 mod 8192.
    let ctx: Arc<Context> = bfv_context(4096, 12289);
    assert!(matches!(
        BatchEncoder::new(&ctx),
        Err(Error::InvalidParameters(_))
    ));
}
