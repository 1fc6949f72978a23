use schemes::error::Error;
use schemes::{
    modulus_chain, BatchEncoder, Ciphertext, CkksEncoder, Context, Decryptor,
    EncryptionParameters, Encryptor, Evaluator, GaloisKeys, KeyGenerator, Plaintext, PublicKey,
    ReaderFrom, RelinKeys, SchemeType, SecretKey, WriterTo,
};

use std::sync::Arc;

fn bfv_context(plain_modulus: u64) -> Arc<Context> {
    let params = EncryptionParameters {
        scheme: SchemeType::Bfv,
        poly_modulus_degree: 4096,
        coeff_modulus: modulus_chain::bfv_default(4096).unwrap(),
        plain_modulus,
    };
    Arc::new(Context::new(&params).unwrap())
}

fn sub_test<F: FnOnce()>(name: &str, f: F) {
    println!("Running {}", name);
    f();
}

#[test]
fn serialization_roundtrips() {
    let ctx: Arc<Context> = bfv_context(40961);
    let mut keygen: KeyGenerator = KeyGenerator::new(&ctx);
    let pk = keygen.create_public_key();
    let rk = keygen.create_relin_keys().unwrap();
    let gk = keygen.create_galois_keys_for_steps(&[1, -1]).unwrap();
    let encoder: BatchEncoder = BatchEncoder::new(&ctx).unwrap();
    let mut encryptor: Encryptor = Encryptor::new(&ctx, &pk).unwrap();
    let decryptor: Decryptor = Decryptor::new(&ctx, keygen.secret_key()).unwrap();
    let evaluator: Evaluator = Evaluator::new(&ctx);

    let values: Vec<u64> = (0..16).collect();
    let pt: Plaintext = encoder.encode(&values).unwrap();
    let ct: Ciphertext = encryptor.encrypt(&pt).unwrap();

    sub_test("test_value_roundtrips", || {
        let loaded: Plaintext = Plaintext::load(&ctx, &pt.save_to_vec()).unwrap();
        assert_eq!(loaded, pt);

        let loaded: Ciphertext = Ciphertext::load(&ctx, &ct.save_to_vec()).unwrap();
        assert_eq!(loaded, ct);

        // The expanded post-multiplication form round-trips too.
        let prod: Ciphertext = evaluator.multiply(&ct, &ct).unwrap();
        let loaded: Ciphertext = Ciphertext::load(&ctx, &prod.save_to_vec()).unwrap();
        assert_eq!(loaded, prod);
    });

    sub_test("test_key_roundtrips", || {
        let loaded: SecretKey = SecretKey::load(&ctx, &keygen.secret_key().save_to_vec()).unwrap();
        assert_eq!(&loaded, keygen.secret_key());

        let loaded: PublicKey = PublicKey::load(&ctx, &pk.save_to_vec()).unwrap();
        assert_eq!(loaded, pk);

        let loaded: RelinKeys = RelinKeys::load(&ctx, &rk.save_to_vec()).unwrap();
        assert_eq!(loaded, rk);

        let loaded: GaloisKeys = GaloisKeys::load(&ctx, &gk.save_to_vec()).unwrap();
        assert_eq!(loaded, gk);
    });

    sub_test("test_loaded_keys_are_functional", || {
        let sk: SecretKey = SecretKey::load(&ctx, &keygen.secret_key().save_to_vec()).unwrap();
        let decryptor2: Decryptor = Decryptor::new(&ctx, &sk).unwrap();
        assert_eq!(encoder.decode(&decryptor2.decrypt(&ct).unwrap()).unwrap(), values);

        let rk2: RelinKeys = RelinKeys::load(&ctx, &rk.save_to_vec()).unwrap();
        let prod: Ciphertext = evaluator
            .relinearize(&evaluator.multiply(&ct, &ct).unwrap(), &rk2)
            .unwrap();
        let decoded: Vec<u64> = encoder.decode(&decryptor.decrypt(&prod).unwrap()).unwrap();
        for (i, &v) in decoded.iter().enumerate().take(16) {
            assert_eq!(v, values[i] * values[i] % 40961);
        }
    });

    sub_test("test_corrupted_streams_are_rejected", || {
        let mut bytes: Vec<u8> = ct.save_to_vec();

        // Bad magic word.
        bytes[0] ^= 0xff;
        assert!(matches!(
            Ciphertext::load(&ctx, &bytes),
            Err(Error::DeserializationError(_))
        ));
        bytes[0] ^= 0xff;

        // Level beyond the chain.
        bytes[13] = 9;
        assert!(matches!(
            Ciphertext::load(&ctx, &bytes),
            Err(Error::DeserializationError(_))
        ));
        bytes[13] = 0;

        // Coefficient pushed outside its modulus.
        let coeff_offset: usize = 13 + 8 + 8 + 8 + 8 + 8 + 8;
        for b in bytes[coeff_offset..coeff_offset + 8].iter_mut() {
            *b = 0xff;
        }
        assert!(matches!(
            Ciphertext::load(&ctx, &bytes),
            Err(Error::DeserializationError(_))
        ));

        // Truncation.
        let bytes: Vec<u8> = ct.save_to_vec();
        assert!(matches!(
            Ciphertext::load(&ctx, &bytes[..bytes.len() / 2]),
            Err(Error::DeserializationError(_))
        ));

        // Mixed-up type tags.
        assert!(matches!(
            Ciphertext::load(&ctx, &pt.save_to_vec()),
            Err(Error::DeserializationError(_))
        ));
    });

    sub_test("test_cross_context_loads_are_rejected", || {
        let other: Arc<Context> = bfv_context(65537);
        assert!(matches!(
            Ciphertext::load(&other, &ct.save_to_vec()),
            Err(Error::DeserializationError(_))
        ));
        assert!(matches!(
            SecretKey::load(&other, &keygen.secret_key().save_to_vec()),
            Err(Error::DeserializationError(_))
        ));
        assert!(matches!(
            RelinKeys::load(&other, &rk.save_to_vec()),
            Err(Error::DeserializationError(_))
        ));
    });
}

#[test]
fn serialization_preserves_approximate_metadata() {
    let params = EncryptionParameters {
        scheme: SchemeType::Ckks,
        poly_modulus_degree: 4096,
        coeff_modulus: modulus_chain::create(4096, &[36, 33, 40]).unwrap(),
        plain_modulus: 0,
    };
    let ctx: Arc<Context> = Arc::new(Context::new(&params).unwrap());
    let mut keygen: KeyGenerator = KeyGenerator::new(&ctx);
    let pk = keygen.create_public_key();
    let encoder: CkksEncoder = CkksEncoder::new(&ctx).unwrap();
    let mut encryptor: Encryptor = Encryptor::new(&ctx, &pk).unwrap();
    let evaluator: Evaluator = Evaluator::new(&ctx);

    let scale: f64 = 2f64.powi(33);
    let pt: Plaintext = encoder.encode(&[1.5, -0.25], scale).unwrap();
    let loaded: Plaintext = Plaintext::load(&ctx, &pt.save_to_vec()).unwrap();
    assert_eq!(loaded, pt);
    assert_eq!(loaded.scale(), scale);

    // A rescaled ciphertext keeps its level and adjusted scale across
    // the byte stream.
    let mut ct: Ciphertext = encryptor.encrypt(&pt).unwrap();
    evaluator.rescale_to_next_inplace(&mut ct).unwrap();
    let loaded: Ciphertext = Ciphertext::load(&ctx, &ct.save_to_vec()).unwrap();
    assert_eq!(loaded, ct);
    assert_eq!(loaded.level(), 1);
    assert_eq!(loaded.scale(), ct.scale());
}
