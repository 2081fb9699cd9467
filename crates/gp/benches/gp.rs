use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use linfa::prelude::{Dataset, Fit};
use ndarray::{Array1, Array2, Zip};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;
use rbf_gp::kernels::RbfKernel;
use rbf_gp::GaussianProcess;

fn griewank(x: &Array2<f64>) -> Array1<f64> {
    let dim = x.ncols();
    let d = Array1::linspace(1., dim as f64, dim).mapv(|v| v.sqrt());
    let mut y = Array1::zeros(x.nrows());
    Zip::from(&mut y).and(x.rows()).par_for_each(|y, x| {
        *y = x.mapv(|v| v * v).sum() / 4000.
            - (x.to_owned() / &d).mapv(|v| v.cos()).fold(1., |acc, x| acc * x)
            + 1.0;
    });
    y
}

fn criterion_gp(c: &mut Criterion) {
    let dims = [2, 5, 10];
    let nts = [100, 300, 500];

    let mut group = c.benchmark_group("gp");
    group.sample_size(20);
    for (dim, nt) in dims.into_iter().zip(nts) {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let xt = Array2::random_using((nt, dim), Uniform::new(-600., 600.), &mut rng);
        let yt = griewank(&xt);
        let xtest = Array2::random_using((100, dim), Uniform::new(-600., 600.), &mut rng);

        group.bench_function(BenchmarkId::new("fit", format!("{nt}x{dim}")), |b| {
            b.iter(|| {
                std::hint::black_box(
                    GaussianProcess::params(1.0, 100.0)
                        .noise(Some(0.01))
                        .fit(&Dataset::new(xt.to_owned(), yt.to_owned()))
                        .expect("GP fit error"),
                )
            });
        });

        let gp = GaussianProcess::params(1.0, 100.0)
            .noise(Some(0.01))
            .fit(&Dataset::new(xt.to_owned(), yt.to_owned()))
            .expect("GP fit error");
        group.bench_function(BenchmarkId::new("predict", format!("{nt}x{dim}")), |b| {
            b.iter(|| std::hint::black_box(gp.predict(&xtest).expect("GP prediction")));
        });
    }
    group.finish();
}

fn criterion_kernel(c: &mut Criterion) {
    let mut group = c.benchmark_group("rbf_kernel");
    let kernel = RbfKernel::new(1.0, 0.5);
    for n in [100, 500, 1000] {
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        let x = Array2::random_using((n, 10), Uniform::new(0., 1.), &mut rng);
        group.bench_function(BenchmarkId::new("value", n), |b| {
            b.iter(|| std::hint::black_box(kernel.value(&x, &x)));
        });
        group.bench_function(BenchmarkId::new("value_sym", n), |b| {
            b.iter(|| std::hint::black_box(kernel.value_sym(&x)));
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_gp, criterion_kernel);
criterion_main!(benches);
