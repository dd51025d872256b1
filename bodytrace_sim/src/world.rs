//! SimWorld - a small kinematic world the trace plugin runs against.
//!
//! The world holds named rigid bodies whose positions follow closed-form
//! motions, plus named static objects with fixed local transforms. It
//! stands in for the physics engine: it implements [`WorldLookup`] and hands
//! out [`TrackedBody`] handles.

use bodytrace_env::{TrackedBody, WorldLookup};
use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// How a simulated body moves over time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    /// Stays where it spawned
    Fixed,

    /// Constant velocity [m/s] from the spawn point
    Linear { velocity: Vector3<f64> },

    /// Circle in the XY plane around `center`
    Orbit {
        center: Point3<f64>,
        radius: f64,
        /// rad/s
        angular_speed: f64,
    },
}

impl Motion {
    /// Position at time `t` for a body spawned at `origin`.
    pub fn position_at(&self, origin: Point3<f64>, t: f64) -> Point3<f64> {
        match *self {
            Motion::Fixed => origin,
            Motion::Linear { velocity } => origin + velocity * t,
            Motion::Orbit {
                center,
                radius,
                angular_speed,
            } => {
                let angle = angular_speed * t;
                Point3::new(
                    center.x + radius * angle.cos(),
                    center.y + radius * angle.sin(),
                    center.z,
                )
            }
        }
    }
}

/// A rigid body in the simulated world.
pub struct SimBody {
    name: String,
    origin: Point3<f64>,
    motion: Motion,
    position: Mutex<Point3<f64>>,
}

impl SimBody {
    fn new(name: &str, origin: Point3<f64>, motion: Motion) -> Self {
        Self {
            name: name.to_string(),
            origin,
            motion,
            position: Mutex::new(motion.position_at(origin, 0.0)),
        }
    }

    fn set_position(&self, position: Point3<f64>) {
        if let Ok(mut p) = self.position.lock() {
            *p = position;
        }
    }
}

impl TrackedBody for SimBody {
    fn local_position(&self) -> Point3<f64> {
        self.position
            .lock()
            .map(|p| *p)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// The simulated world.
pub struct SimWorld {
    bodies: HashMap<String, Arc<SimBody>>,
    objects: HashMap<String, Isometry3<f64>>,

    /// RNG for position jitter
    rng: ChaCha8Rng,
    jitter: Option<Normal<f64>>,

    current_time: f64,
}

impl SimWorld {
    /// Creates an empty world. `seed` drives position jitter only.
    pub fn new(seed: u64) -> Self {
        Self {
            bodies: HashMap::new(),
            objects: HashMap::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            jitter: None,
            current_time: 0.0,
        }
    }

    /// The default scene: an orbiting tool tip, a drifting needle and a
    /// phantom object rotated a quarter turn about z.
    pub fn standard(seed: u64) -> Self {
        let mut world = Self::new(seed);
        world.spawn_body(
            "tip",
            Point3::new(0.1, 0.0, 0.5),
            Motion::Orbit {
                center: Point3::new(0.0, 0.0, 0.5),
                radius: 0.1,
                angular_speed: 1.0,
            },
        );
        world.spawn_body(
            "needle",
            Point3::new(-0.2, 0.0, 0.3),
            Motion::Linear {
                velocity: Vector3::new(0.02, 0.01, 0.0),
            },
        );
        world.add_object(
            "phantom",
            Isometry3::from_parts(
                Translation3::new(0.2, 0.0, 0.1),
                UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2),
            ),
        );
        world
    }

    /// Gaussian jitter (std dev in meters) added to body positions each step.
    pub fn set_position_jitter(&mut self, std_dev: f64) {
        self.jitter = if std_dev > 0.0 {
            Normal::new(0.0, std_dev).ok()
        } else {
            None
        };
    }

    /// Adds a body and returns its handle.
    pub fn spawn_body(&mut self, name: &str, origin: Point3<f64>, motion: Motion) -> Arc<SimBody> {
        let body = Arc::new(SimBody::new(name, origin, motion));
        self.bodies.insert(name.to_string(), body.clone());
        body
    }

    /// Adds a static object with a fixed local transform.
    pub fn add_object(&mut self, name: &str, transform: Isometry3<f64>) {
        self.objects.insert(name.to_string(), transform);
    }

    /// Advances time by `dt` seconds and moves every body.
    pub fn step(&mut self, dt: f64) {
        self.current_time += dt;
        for body in self.bodies.values() {
            let mut position = body.motion.position_at(body.origin, self.current_time);
            if let Some(normal) = &self.jitter {
                position += Vector3::new(
                    normal.sample(&mut self.rng),
                    normal.sample(&mut self.rng),
                    normal.sample(&mut self.rng),
                );
            }
            body.set_position(position);
        }
    }

    pub fn time(&self) -> f64 {
        self.current_time
    }

    pub fn body(&self, name: &str) -> Option<&Arc<SimBody>> {
        self.bodies.get(name)
    }

    /// Names of all bodies and objects, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .bodies
            .keys()
            .chain(self.objects.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }
}

impl WorldLookup for SimWorld {
    fn rigid_body(&self, name: &str) -> Option<Arc<dyn TrackedBody>> {
        self.bodies
            .get(name)
            .map(|body| body.clone() as Arc<dyn TrackedBody>)
    }

    /// Static objects first; a body's transform is its current position.
    fn object_transform(&self, name: &str) -> Option<Isometry3<f64>> {
        if let Some(transform) = self.objects.get(name) {
            return Some(*transform);
        }
        self.bodies.get(name).map(|body| {
            let p = body.local_position();
            Isometry3::translation(p.x, p.y, p.z)
        })
    }
}
