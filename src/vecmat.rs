use std::ops::{Add, Mul, Sub, Deref, Div};

/// Creates a n-dimensional vector type and implements the arithmetic
/// needed for image and camera coordinates.
///
/// # Arguments:
/// * `$Vec` name of the created vector type
/// * `$n` number of the dimension
///
/// # Example:
/// `vector!(Vec2, 2)`
macro_rules! vector {
    ($Vec: ident, $n: expr) => {

        #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
        pub struct $Vec<T>(pub [T; $n]);

        impl<T> $Vec<T>{
            pub fn new(coord: [T;$n]) -> $Vec<T>{ $Vec(coord) }
        }

        impl<T> From<[T;$n]> for $Vec<T>{
            fn from(coord: [T;$n]) -> $Vec<T>{
                $Vec(coord)
            }
        }

        impl<T> From<$Vec<T>> for [T;$n]{
            fn from(v: $Vec<T>) -> [T;$n]{
                v.0
            }
        }

        impl<T> Deref for $Vec<T>{
            type Target = [T;$n];

            fn deref(&self) -> &[T;$n]{
                &self.0
            }
        }

        impl<T> Add for $Vec<T> where T: Add<Output=T>+Copy{
            type Output = $Vec<T>;
            fn add(self, rhs: $Vec<T>) -> Self::Output{
                let mut me = self;
                for i in 0..$n{
                    me.0[i] = me.0[i] + rhs.0[i];
                }
                me
            }
        }

        impl<T> Sub for $Vec<T> where T: Sub<Output=T>+Copy{
            type Output = $Vec<T>;
            fn sub(self, rhs: $Vec<T>) -> Self::Output{
                let mut me = self;
                for i in 0..$n{
                    me.0[i] = me.0[i] - rhs.0[i];
                }
                me
            }
        }

        impl<T> Div<T> for $Vec<T> where T: Div<T, Output=T>+Copy{
            type Output = $Vec<T>;
            fn div(self, rhs: T) -> $Vec<T>{
                let mut me = self;
                for i in 0..$n{
                    me.0[i] = me.0[i] / rhs;
                }
                me
            }
        }

        impl<T> Mul<T> for $Vec<T> where T: Mul<T, Output=T> + Copy{
            type Output = $Vec<T>;
            fn mul(self, rhs: T) -> $Vec<T>{
                let mut me = self;
                for i in 0..$n{
                    me.0[i] = me.0[i] * rhs;
                }
                me
            }
        }
    }
}

/// Creates a nxn-matrix type acting on the vector type `$Vec`.
macro_rules! matrix {
    ($Mat: ident, $Vec: ident, $n: expr) => {

        #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
        pub struct $Mat<T>(pub [[T;$n];$n]);

        impl<T> From<[[T;$n];$n]> for $Mat<T>{
            fn from(rows: [[T;$n];$n]) -> $Mat<T>{
                $Mat(rows)
            }
        }

        impl<T> Div<T> for $Mat<T> where T: Div<T, Output=T>+Copy{
            type Output = $Mat<T>;
            fn div(self, rhs: T) -> $Mat<T>{
                let mut me = self;
                for i in 0..$n{
                    for j in 0..$n{
                        me.0[j][i] = me.0[j][i] / rhs;
                    }
                }
                me
            }
        }

        impl<T> Mul<$Vec<T>> for $Mat<T> where T: Add<Output=T> + Mul<T, Output=T> + Copy{
            type Output=$Vec<T>;
            fn mul(self, rhs: $Vec<T>) -> $Vec<T>{
                let mut res = rhs;
                for j in 0..$n{
                    let mut tmp = rhs.0[0] * self.0[j][0];
                    for i in 1..$n{
                        tmp = tmp + rhs.0[i] * self.0[j][i];
                    }
                    res.0[j] = tmp;
                }
                res
            }
        }
    }
}

vector!(Vec2, 2);
vector!(Vec3, 3);
matrix!(Mat3, Vec3, 3);

/// Integer image coordinate
pub type Vec2i = Vec2<i32>;

impl Vec2<i32> {
    pub fn x(&self) -> i32 {
        self.0[0]
    }
    pub fn y(&self) -> i32 {
        self.0[1]
    }
    pub fn to_f32(&self) -> Vec2<f32> {
        Vec2([self.0[0] as f32, self.0[1] as f32])
    }
}

/// Determinant and inverse of a matrix
pub trait MatrixFunc {
    type Output;
    /// Computes the determinant of a matrix
    fn det(&self) -> Self::Output;
    /// Computes the inverse of a matrix
    fn inv(&self) -> Self;
}

impl<T> MatrixFunc for Mat3<T>
where T: Sub<T, Output = T> + Mul<T, Output = T> + Add<Output = T> + Div<T, Output=T> + Copy
{
    type Output = T;
    fn det(&self) -> T {
        self.0[0][0] * (self.0[1][1] * self.0[2][2] - self.0[1][2] * self.0[2][1]) -
            self.0[1][0] * (self.0[0][1] * self.0[2][2] - self.0[0][2] * self.0[2][1]) +
            self.0[2][0] * (self.0[0][1] * self.0[1][2] - self.0[0][2] * self.0[1][1])
    }
    fn inv(&self) -> Mat3<T>{
        let (a,b,c) = (self.0[0][0], self.0[0][1], self.0[0][2]);
        let (d,e,f) = (self.0[1][0], self.0[1][1], self.0[1][2]);
        let (g,h,i) = (self.0[2][0], self.0[2][1], self.0[2][2]);
        Mat3([ [e*i-f*h,c*h-b*i,b*f-c*e],
               [f*g-d*i,a*i-c*g,c*d-a*f],
               [d*h-e*g,b*g-a*h,a*e-b*d]])
            / self.det()
    }
}
