use env_logger::{Builder, Env};
use linfa::prelude::*;
use ndarray::{arr2, concatenate, Array, Array1, Array2, Axis};
use rbf_gp::buffers::{regress, Hyperparameters, MatrixBuffer};
use rbf_gp::GaussianProcess;

fn xsinx(x: &Array2<f64>) -> Array1<f64> {
    ((x - 3.5) * ((x - 3.5) / std::f64::consts::PI).mapv(|v| v.sin())).remove_axis(Axis(1))
}

fn main() {
    let env = Env::new().filter_or("RBFGP_LOG", "info");
    Builder::from_env(env).init();

    let xt = arr2(&[[0.0], [5.0], [10.0], [15.0], [18.0], [20.0], [25.0]]);
    let yt = xsinx(&xt);

    println!("Train GP surrogate of 'xsinx' at {}", xt.column(0));
    let gp = GaussianProcess::params(5.0, 4.0)
        .noise(Some(0.1))
        .fit(&Dataset::new(xt.to_owned(), yt.to_owned()))
        .expect("GP fitting");
    println!("{gp}");

    let xtest = Array::linspace(0., 25., 26).insert_axis(Axis(1));
    let ytest = xsinx(&xtest);
    let posterior = gp.predict(&xtest).expect("GP prediction");
    // predict standard deviation
    let ysigma = posterior.variance.mapv(|v| v.max(0.).sqrt());

    println!("Compute prediction errors (x, err(x), sigma(x))");
    println!(
        "{}",
        concatenate![
            Axis(1),
            xtest,
            (posterior.mean - ytest).insert_axis(Axis(1)),
            ysigma.insert_axis(Axis(1))
        ]
    );

    // Same regression through flat buffers
    let x = MatrixBuffer::from_array(&xt);
    let y = MatrixBuffer::from_vector(&yt);
    let xq = MatrixBuffer::new(vec![2.5, 12.5, 22.5], 3, 1).expect("query buffer");
    let hyperparameters = Hyperparameters {
        variance: 5.0,
        length_scale: 4.0,
        noise: Some(0.1),
        mean: None,
    };
    let res = regress(&x, &y, &xq, &hyperparameters).expect("GP regression");
    println!("mean at {:?} = {:?}", xq.data(), res.mean.data());
    println!("variance at {:?} = {:?}", xq.data(), res.variance.data());
}
