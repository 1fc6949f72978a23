use criterion::{criterion_group, criterion_main, Criterion};
use schemes::{
    modulus_chain, BatchEncoder, Ciphertext, CkksEncoder, Context, EncryptionParameters,
    Encryptor, Evaluator, KeyGenerator, SchemeType,
};

use std::sync::Arc;

fn bench_bfv(c: &mut Criterion) {
    let params = EncryptionParameters {
        scheme: SchemeType::Bfv,
        poly_modulus_degree: 4096,
        coeff_modulus: modulus_chain::bfv_default(4096).unwrap(),
        plain_modulus: 40961,
    };
    let ctx: Arc<Context> = Arc::new(Context::new(&params).unwrap());
    let mut keygen: KeyGenerator = KeyGenerator::new(&ctx);
    let pk = keygen.create_public_key();
    let rk = keygen.create_relin_keys().unwrap();
    let encoder: BatchEncoder = BatchEncoder::new(&ctx).unwrap();
    let mut encryptor: Encryptor = Encryptor::new(&ctx, &pk).unwrap();
    let evaluator: Evaluator = Evaluator::new(&ctx);

    let a: Ciphertext = encryptor.encrypt(&encoder.encode(&[3, 1, 4, 1, 5]).unwrap()).unwrap();
    let b: Ciphertext = encryptor.encrypt(&encoder.encode(&[2, 7, 1, 8, 2]).unwrap()).unwrap();
    let prod: Ciphertext = evaluator.multiply(&a, &b).unwrap();

    let mut group = c.benchmark_group("bfv/n=4096");
    group.bench_function("add", |bench| bench.iter(|| evaluator.add(&a, &b).unwrap()));
    group.bench_function("multiply", |bench| {
        bench.iter(|| evaluator.multiply(&a, &b).unwrap())
    });
    group.bench_function("relinearize", |bench| {
        bench.iter(|| evaluator.relinearize(&prod, &rk).unwrap())
    });
    group.finish();
}

fn bench_ckks(c: &mut Criterion) {
    let params = EncryptionParameters {
        scheme: SchemeType::Ckks,
        poly_modulus_degree: 4096,
        coeff_modulus: modulus_chain::create(4096, &[36, 33, 40]).unwrap(),
        plain_modulus: 0,
    };
    let ctx: Arc<Context> = Arc::new(Context::new(&params).unwrap());
    let mut keygen: KeyGenerator = KeyGenerator::new(&ctx);
    let pk = keygen.create_public_key();
    let gk = keygen.create_galois_keys().unwrap();
    let encoder: CkksEncoder = CkksEncoder::new(&ctx).unwrap();
    let mut encryptor: Encryptor = Encryptor::new(&ctx, &pk).unwrap();
    let evaluator: Evaluator = Evaluator::new(&ctx);

    let scale: f64 = 2f64.powi(33);
    let a: Ciphertext = encryptor
        .encrypt(&encoder.encode(&[1.5, -2.25, 0.5], scale).unwrap())
        .unwrap();

    let mut group = c.benchmark_group("ckks/n=4096");
    group.bench_function("rescale_to_next", |bench| {
        bench.iter(|| evaluator.rescale_to_next(&a).unwrap())
    });
    group.bench_function("rotate_vector", |bench| {
        bench.iter(|| evaluator.rotate_vector(&a, 1, &gk).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_bfv, bench_ckks);
criterion_main!(benches);
